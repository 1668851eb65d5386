use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which counter an edit targets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Campo {
    Entregues,
    Prometidas,
}

impl Campo {
    pub fn as_str(self) -> &'static str {
        match self {
            Campo::Entregues => "entregues",
            Campo::Prometidas => "prometidas",
        }
    }

    /// Heading shown on the edit overlay.
    pub fn label(self) -> &'static str {
        match self {
            Campo::Entregues => "Editar creches entregues",
            Campo::Prometidas => "Editar creches prometidas",
        }
    }
}

impl std::str::FromStr for Campo {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entregues" => Ok(Campo::Entregues),
            "prometidas" => Ok(Campo::Prometidas),
            _ => Err(EditError::UnknownField),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Digite um número válido")]
    InvalidNumber,

    #[error("Campo inválido")]
    UnknownField,

    #[error("Entregues não pode ser maior que prometidas")]
    DeliveredAbovePromised,

    #[error("Prometidas não pode ser menor que entregues")]
    PromisedBelowDelivered,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub entregues: u32,
    pub prometidas: u32,
}

impl Progress {
    pub fn new(entregues: u32, prometidas: u32) -> Self {
        Self {
            entregues,
            prometidas,
        }
    }

    /// Delivered over promised as a percentage, never above 100.
    pub fn percent(&self) -> f64 {
        if self.prometidas == 0 {
            return 0.0;
        }

        let percent = (self.entregues as f64 / self.prometidas as f64) * 100.0;

        percent.min(100.0)
    }

    /// Text next to the bar, e.g. `66.67%`. Exact halves round up (`3.125` is `3.13%`).
    pub fn label(&self) -> String {
        format!("{}%", two_decimals(self.percent()))
    }

    /// Bar width as a CSS percentage, unrounded.
    pub fn bar_width(&self) -> String {
        format!("{}%", self.percent())
    }

    pub fn get(&self, campo: Campo) -> u32 {
        match campo {
            Campo::Entregues => self.entregues,
            Campo::Prometidas => self.prometidas,
        }
    }

    /// Checks that writing `valor` keeps delivered at or below promised.
    pub fn check(&self, campo: Campo, valor: u32) -> Result<(), EditError> {
        match campo {
            Campo::Entregues if valor > self.prometidas => Err(EditError::DeliveredAbovePromised),
            Campo::Prometidas if valor < self.entregues => Err(EditError::PromisedBelowDelivered),
            _ => Ok(()),
        }
    }

    pub fn apply(&mut self, campo: Campo, valor: u32) {
        match campo {
            Campo::Entregues => self.entregues = valor,
            Campo::Prometidas => self.prometidas = valor,
        }
    }
}

fn two_decimals(value: f64) -> String {
    // a value sits exactly on a half of the last digit only when it is an odd number of eighths
    let eighths = value * 8.0;

    if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        return format!("{:.2}", (value * 100.0).round() / 100.0);
    }

    format!("{value:.2}")
}

/// Reads a counter back from its displayed text, blank or garbage is 0.
pub fn parse_counter(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

/// Parses the value typed into the edit overlay.
pub fn parse_valor(input: &str) -> Result<u32, EditError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(EditError::InvalidNumber);
    }

    input.parse().map_err(|_| EditError::InvalidNumber)
}

#[cfg(test)]
mod tests {
    use super::{Campo, EditError, Progress, parse_counter, parse_valor};

    #[test]
    fn test_percent() {
        assert_eq!(Progress::new(0, 0).percent(), 0.0);
        assert_eq!(Progress::new(5, 0).percent(), 0.0);
        assert_eq!(Progress::new(1, 8).percent(), 12.5);
        assert_eq!(Progress::new(10, 10).percent(), 100.0);
        assert_eq!(Progress::new(30, 10).percent(), 100.0);
    }

    #[test]
    fn test_label() {
        assert_eq!(Progress::new(2, 3).label(), "66.67%");
        assert_eq!(Progress::new(0, 3).label(), "0.00%");
        assert_eq!(Progress::new(1, 8).label(), "12.50%");
        assert_eq!(Progress::new(9, 3).label(), "100.00%");
    }

    #[test]
    fn test_label_rounds_halves_up() {
        assert_eq!(Progress::new(1, 32).label(), "3.13%");
        assert_eq!(Progress::new(5, 32).label(), "15.63%");
        assert_eq!(Progress::new(3, 32).label(), "9.38%");
        assert_eq!(Progress::new(1, 800).label(), "0.13%");
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(Progress::new(2, 3).bar_width(), "66.66666666666666%");
        assert_eq!(Progress::new(1, 2).bar_width(), "50%");
        assert_eq!(Progress::new(3, 3).bar_width(), "100%");
        assert_eq!(Progress::new(0, 0).bar_width(), "0%");
    }

    #[test]
    fn test_check() {
        let progress = Progress::new(4, 10);

        assert_eq!(progress.check(Campo::Entregues, 10), Ok(()));
        assert_eq!(
            progress.check(Campo::Entregues, 11),
            Err(EditError::DeliveredAbovePromised)
        );
        assert_eq!(progress.check(Campo::Prometidas, 4), Ok(()));
        assert_eq!(
            progress.check(Campo::Prometidas, 3),
            Err(EditError::PromisedBelowDelivered)
        );
    }

    #[test]
    fn test_apply() {
        let mut progress = Progress::new(4, 10);
        progress.apply(Campo::Prometidas, 20);
        progress.apply(Campo::Entregues, 5);

        assert_eq!(progress, Progress::new(5, 20));
        assert_eq!(progress.get(Campo::Entregues), 5);
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("12"), 12);
        assert_eq!(parse_counter(" 7 "), 7);
        assert_eq!(parse_counter(""), 0);
        assert_eq!(parse_counter("abc"), 0);
    }

    #[test]
    fn test_parse_valor() {
        assert_eq!(parse_valor(" 15 "), Ok(15));
        assert_eq!(parse_valor("0"), Ok(0));
        assert_eq!(parse_valor(""), Err(EditError::InvalidNumber));
        assert_eq!(parse_valor("-1"), Err(EditError::InvalidNumber));
        assert_eq!(parse_valor("2.5"), Err(EditError::InvalidNumber));
        assert_eq!(parse_valor("dez"), Err(EditError::InvalidNumber));
    }

    #[test]
    fn test_campo() {
        assert_eq!("entregues".parse::<Campo>(), Ok(Campo::Entregues));
        assert_eq!("outro".parse::<Campo>(), Err(EditError::UnknownField));
        assert_eq!(Campo::Prometidas.label(), "Editar creches prometidas");
        assert_eq!(serde_json::to_string(&Campo::Entregues).unwrap(), "\"entregues\"");
    }
}
