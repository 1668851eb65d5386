//! Request and response bodies of the `/api/*` endpoints.
use serde::{Deserialize, Serialize};

pub use crate::progress::{Campo, Progress as Creches};

/// Login-or-register form. Digits may arrive masked.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InformacoesRequest {
    #[serde(default)]
    pub cpf: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginResponse {
    pub sucesso: bool,
    pub admin: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResponse {
    pub logado: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub nome_pendente: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NomeRequest {
    pub nome: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SucessoResponse {
    pub sucesso: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtualizarCrecheRequest {
    pub campo: Campo,
    pub valor: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DispositivoRequest {
    pub fingerprint: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErroResponse {
    pub erro: String,
}
