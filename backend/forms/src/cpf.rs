use crate::mask::only_digits;

pub const CPF_LEN: usize = 11;

fn check_digit(digits: &[u8]) -> u8 {
    let first_weight = digits.len() as u32 + 1;

    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(index, &digit)| digit as u32 * (first_weight - index as u32))
        .sum();

    match (sum * 10) % 11 {
        10 => 0,
        rest => rest as u8,
    }
}

/// Both check digits for a nine digit base.
pub fn check_digits(base: &[u8; 9]) -> [u8; 2] {
    let first = check_digit(base);

    let mut extended = [0u8; 10];
    extended[..9].copy_from_slice(base);
    extended[9] = first;

    [first, check_digit(&extended)]
}

pub fn is_valid(cpf: &str) -> bool {
    let digits: Vec<u8> = only_digits(cpf).bytes().map(|b| b - b'0').collect();

    if digits.len() != CPF_LEN {
        return false;
    }

    // 000.000.000-00, 111.111.111-11, ... pass the checksum but are never issued
    if digits.iter().all(|&digit| digit == digits[0]) {
        return false;
    }

    let mut base = [0u8; 9];
    base.copy_from_slice(&digits[..9]);

    check_digits(&base) == [digits[9], digits[10]]
}

#[cfg(test)]
mod tests {
    use super::{check_digits, is_valid};

    #[test]
    fn test_valid() {
        assert!(is_valid("52998224725"));
        assert!(is_valid("529.982.247-25"));
        assert!(is_valid("11144477735"));
        assert!(is_valid("12345678909"));
        assert!(is_valid("39053344705"));
    }

    #[test]
    fn test_wrong_check_digits() {
        assert!(!is_valid("52998224724"));
        assert!(!is_valid("52998224715"));
        assert!(!is_valid("12345678900"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!is_valid(""));
        assert!(!is_valid("5299822472"));
        assert!(!is_valid("529982247250"));
    }

    #[test]
    fn test_repeated_digits() {
        for digit in 0..=9 {
            let cpf = digit.to_string().repeat(11);
            assert!(!is_valid(&cpf), "{cpf} should be rejected");
        }
    }

    #[test]
    fn test_check_digits() {
        assert_eq!(check_digits(&[5, 2, 9, 9, 8, 2, 2, 4, 7]), [2, 5]);
        assert_eq!(check_digits(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), [0, 9]);
    }
}
