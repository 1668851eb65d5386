use forms::{cpf, mask_cpf, mask_phone, only_digits, payloads::InformacoesRequest, phone};
use tracing::{error, info};

use crate::{api::ApiClient, error::ClientError};

/// Where the browser goes after a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Admin,
    Home,
}

impl Destination {
    pub fn from_admin(admin: bool) -> Self {
        if admin { Destination::Admin } else { Destination::Home }
    }

    pub fn path(self) -> &'static str {
        match self {
            Destination::Admin => "/admin",
            Destination::Home => "/home",
        }
    }
}

/// Input highlighted alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Cpf,
    Telefone,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub cpf: String,
    pub telefone: String,
    pub erro: Option<String>,
    pub campo_erro: Option<Field>,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_cpf(&mut self, value: &str) {
        self.cpf = mask_cpf(value);
        self.clear_error();
    }

    pub fn input_telefone(&mut self, value: &str) {
        self.telefone = mask_phone(value);
        self.clear_error();
    }

    pub fn clear_error(&mut self) {
        self.erro = None;
        self.campo_erro = None;
    }

    fn show_error(&mut self, message: &str, field: Option<Field>) {
        self.erro = Some(message.to_string());
        self.campo_erro = field;
    }

    /// Digits-only request body, or `None` with the error shown.
    pub fn validate(&mut self) -> Option<InformacoesRequest> {
        self.clear_error();

        let cpf = only_digits(&self.cpf);
        let telefone = only_digits(&self.telefone);

        if !cpf::is_valid(&cpf) {
            self.show_error("CPF inválido.", Some(Field::Cpf));
            return None;
        }

        if !phone::is_valid(&telefone) {
            self.show_error("Telefone inválido.", Some(Field::Telefone));
            return None;
        }

        Some(InformacoesRequest {
            cpf,
            telefone,
            nome: None,
        })
    }

    pub async fn submit(&mut self, api: &ApiClient) -> Option<Destination> {
        let request = self.validate()?;

        match api.informacoes(&request).await {
            Ok(response) => {
                let destination = Destination::from_admin(response.admin);
                info!("Logged in, going to {}", destination.path());
                Some(destination)
            }
            Err(e) => {
                let message = match &e {
                    e if e.is_connection() => {
                        error!("{e}");
                        "Erro de conexão."
                    }
                    ClientError::MissingCsrf => "Erro de segurança. Recarregue a página.",
                    other => other.server_message().unwrap_or("Erro no servidor"),
                };
                self.show_error(message, None);
                None
            }
        }
    }
}

/// Skips the form when the session cookie is still valid.
pub async fn auto_login(api: &ApiClient) -> Option<Destination> {
    match api.session().await {
        Ok(session) if session.logado => {
            Some(Destination::from_admin(session.admin.unwrap_or(false)))
        }
        _ => None,
    }
}
