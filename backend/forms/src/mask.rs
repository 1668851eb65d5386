/// Longest digit string accepted by either mask.
pub const MAX_DIGITS: usize = 11;

pub fn only_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn truncated_digits(input: &str) -> Vec<char> {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(MAX_DIGITS)
        .collect()
}

/// Formats up to 11 digits as `000.000.000-00`, leaving out separators the
/// digits have not reached yet.
pub fn mask_cpf(input: &str) -> String {
    let digits = truncated_digits(input);
    let mut masked = String::with_capacity(MAX_DIGITS + 3);

    for (index, digit) in digits.iter().enumerate() {
        match index {
            3 | 6 => masked.push('.'),
            9 => masked.push('-'),
            _ => {}
        }
        masked.push(*digit);
    }

    masked
}

/// Formats up to 11 digits as `(00) 0 0000-0000`.
///
/// - Under 3 digits nothing is added
/// - From 3 digits the DDD goes in parentheses
/// - From 8 digits the subscriber number is split as `0 0000-0...`
pub fn mask_phone(input: &str) -> String {
    let digits = truncated_digits(input);

    if digits.len() < 3 {
        return digits.into_iter().collect();
    }

    let (ddd, number) = digits.split_at(2);
    let mut masked = format!("({}{}) ", ddd[0], ddd[1]);

    if digits.len() < 8 {
        masked.extend(number);
        return masked;
    }

    masked.push(number[0]);
    masked.push(' ');
    masked.extend(&number[1..5]);
    masked.push('-');
    masked.extend(&number[5..]);

    masked
}
