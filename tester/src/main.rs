use std::fs;

use anyhow::Result;
use forms::{cpf::check_digits, mask_cpf, mask_phone, payloads::InformacoesRequest, phone::DDDS};
use rand::{Rng, seq::SliceRandom};

const PAYLOAD_PATH: &str = "../test.json";

fn random_cpf(rng: &mut impl Rng) -> String {
    loop {
        let mut base = [0u8; 9];
        rng.fill(&mut base[..]);
        base.iter_mut().for_each(|digit| *digit %= 10);

        // repeated digits are rejected by the validator
        if base.iter().all(|&digit| digit == base[0]) {
            continue;
        }

        return base
            .iter()
            .chain(check_digits(&base).iter())
            .map(|digit| char::from(b'0' + digit))
            .collect();
    }
}

fn random_phone(rng: &mut impl Rng) -> String {
    let ddd = DDDS.choose(rng).copied().unwrap_or("11");
    let subscriber: u32 = rng.gen_range(0..100_000_000);

    format!("{ddd}9{subscriber:08}")
}

fn main() -> Result<()> {
    let mut rng = rand::thread_rng();

    let payload = InformacoesRequest {
        cpf: random_cpf(&mut rng),
        telefone: random_phone(&mut rng),
        nome: None,
    };

    println!("CPF: {}", mask_cpf(&payload.cpf));
    println!("Telefone: {}", mask_phone(&payload.telefone));

    fs::write(PAYLOAD_PATH, serde_json::to_vec_pretty(&payload)?)?;
    println!("Payload written to {PAYLOAD_PATH}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use forms::{cpf, phone};
    use rand::{SeedableRng, rngs::StdRng};

    use super::{random_cpf, random_phone};

    #[test]
    fn test_generated_values_validate() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let generated = random_cpf(&mut rng);
            assert!(cpf::is_valid(&generated), "{generated}");

            let generated = random_phone(&mut rng);
            assert!(phone::is_valid(&generated), "{generated}");
        }
    }
}
