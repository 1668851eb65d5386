use forms::{
    Campo, Progress,
    progress::{EditError, parse_valor},
};
use tracing::{error, info};

use crate::api::ApiClient;

/// Admin overlay editing one of the two counters.
#[derive(Debug, Default)]
pub struct EditOverlay {
    pub visible: bool,
    pub campo: Option<Campo>,
    pub erro: Option<String>,
}

impl EditOverlay {
    pub fn open(&mut self, campo: Campo) {
        self.campo = Some(campo);
        self.erro = None;
        self.visible = true;
    }

    pub fn cancel(&mut self) {
        self.visible = false;
    }

    pub fn label(&self) -> Option<&'static str> {
        self.campo.map(Campo::label)
    }
}

#[derive(Debug, Default)]
pub struct CrechesPanel {
    pub progress: Progress,
    pub edit: EditOverlay,
}

impl CrechesPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the counters, a failure keeps whatever was shown before.
    pub async fn load(&mut self, api: &ApiClient) -> bool {
        match api.creches().await {
            Ok(creches) => {
                self.progress = creches;
                true
            }
            Err(e) => {
                error!("Erro ao carregar dados: {e}");
                false
            }
        }
    }

    /// Percentage text next to the bar.
    pub fn label(&self) -> String {
        self.progress.label()
    }

    pub fn bar_width(&self) -> String {
        self.progress.bar_width()
    }

    /// Checks the typed value against the counters currently displayed.
    pub fn validate(&self, input: &str) -> Result<(Campo, u32), EditError> {
        let campo = self.edit.campo.ok_or(EditError::UnknownField)?;
        let valor = parse_valor(input)?;

        self.progress.check(campo, valor)?;

        Ok((campo, valor))
    }

    /// Returns whether the value was saved, the overlay hides when it was.
    pub async fn save(&mut self, api: &ApiClient, input: &str) -> bool {
        self.edit.erro = None;

        let (campo, valor) = match self.validate(input) {
            Ok(edit) => edit,
            Err(e) => {
                self.edit.erro = Some(e.to_string());
                return false;
            }
        };

        match api.atualizar_creche(campo, valor).await {
            Ok(creches) => {
                info!(campo = campo.as_str(), valor, "Counter saved");
                // other admins may have edited the other counter meanwhile
                self.progress = creches;
                self.edit.visible = false;
                true
            }
            Err(e) => {
                self.edit.erro = Some(
                    match &e {
                        e if e.is_connection() => "Erro de conexão",
                        other => other.server_message().unwrap_or("Erro ao salvar"),
                    }
                    .to_string(),
                );
                false
            }
        }
    }
}
