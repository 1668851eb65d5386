use forms::name;
use tracing::{error, info};

use crate::{api::ApiClient, error::ClientError};

/// First-visit overlay asking the user to complete their name.
#[derive(Debug, Default)]
pub struct NameOverlay {
    pub visible: bool,
    pub erro: Option<String>,
}

impl NameOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the overlay iff the server reports the name as pending.
    pub async fn load(&mut self, api: &ApiClient) {
        match api.usuario_status().await {
            Ok(status) => self.visible = status.nome_pendente,
            Err(e) => error!("Erro ao verificar status do usuário: {e}"),
        }
    }

    /// Returns whether the name was saved, the overlay hides when it was.
    pub async fn save(&mut self, api: &ApiClient, input: &str) -> bool {
        self.erro = None;

        let nome = match name::validate(input) {
            Ok(nome) => nome,
            Err(e) => {
                self.erro = Some(e.to_string());
                return false;
            }
        };

        match api.completar_nome(&nome).await {
            Ok(_) => {
                info!("Name saved");
                self.visible = false;
                true
            }
            Err(e) => {
                self.erro = Some(
                    match &e {
                        ClientError::MissingCsrf => "Erro de segurança. Recarregue a página.",
                        e if e.is_connection() => "Erro de conexão com o servidor",
                        other => other.server_message().unwrap_or("Erro ao salvar nome"),
                    }
                    .to_string(),
                );
                false
            }
        }
    }
}
