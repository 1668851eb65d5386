use std::sync::Arc;

use forms::payloads::{
    AtualizarCrecheRequest, Campo, Creches, DispositivoRequest, ErroResponse, InformacoesRequest,
    LoginResponse, NomeRequest, SessionResponse, StatusResponse, SucessoResponse,
};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode, Url,
    cookie::{CookieStore, Jar},
    redirect::Policy,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Value of `name` in a `Cookie` header (`a=1; b=2`).
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(str::to_string)
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let jar = Arc::new(Jar::default());

        let http = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .user_agent(concat!("creches-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, jar, base })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    /// Every cookie held for the server, as a `Cookie` header value.
    pub fn cookies(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;

        header.to_str().ok().map(str::to_string)
    }

    /// Puts back cookies saved with [`ApiClient::cookies`].
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            self.jar.add_cookie_str(pair, &self.base);
        }
    }

    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;

        cookie_value(header.to_str().ok()?, CSRF_COOKIE)
    }

    /// Adds the CSRF header, fetching the cookie first if this client never talked to the
    /// server, the same way a page load would.
    async fn with_csrf(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        if self.csrf_token().is_none() {
            debug!("No CSRF cookie yet, priming");
            self.http.get(self.url("/api/session")?).send().await?;
        }

        let token = self.csrf_token().ok_or(ClientError::MissingCsrf)?;

        Ok(request.header(CSRF_HEADER, token))
    }

    async fn error(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let message = response.json::<ErroResponse>().await.ok().map(|e| e.erro);

        ClientError::Api { status, message }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::error(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn session(&self) -> Result<SessionResponse, ClientError> {
        let response = self.http.get(self.url("/api/session")?).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED => Ok(SessionResponse {
                logado: false,
                admin: None,
            }),
            _ => Err(Self::error(response).await),
        }
    }

    pub async fn informacoes(
        &self,
        request: &InformacoesRequest,
    ) -> Result<LoginResponse, ClientError> {
        let builder = self.http.post(self.url("/api/informacoes")?).json(request);

        Self::send(self.with_csrf(builder).await?).await
    }

    pub async fn usuario_status(&self) -> Result<StatusResponse, ClientError> {
        Self::send(self.http.get(self.url("/api/usuario/status")?)).await
    }

    pub async fn completar_nome(&self, nome: &str) -> Result<SucessoResponse, ClientError> {
        let builder = self
            .http
            .post(self.url("/api/completar-nome")?)
            .json(&NomeRequest {
                nome: nome.to_string(),
            });

        Self::send(self.with_csrf(builder).await?).await
    }

    pub async fn creches(&self) -> Result<Creches, ClientError> {
        Self::send(self.http.get(self.url("/api/creches")?)).await
    }

    pub async fn atualizar_creche(&self, campo: Campo, valor: u32) -> Result<Creches, ClientError> {
        let builder = self
            .http
            .patch(self.url("/api/creches")?)
            .json(&AtualizarCrecheRequest { campo, valor });

        Self::send(self.with_csrf(builder).await?).await
    }

    pub async fn dispositivo(&self, fingerprint: &str) -> Result<(), ClientError> {
        let builder = self
            .http
            .post(self.url("/api/dispositivo")?)
            .json(&DispositivoRequest {
                fingerprint: fingerprint.to_string(),
            });

        let response = self.with_csrf(builder).await?.send().await?;

        if !response.status().is_success() {
            return Err(Self::error(response).await);
        }

        Ok(())
    }

    /// Ends the session, the server answers with a redirect to `/`.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.url("/logout")?).send().await?;

        if response.status().is_redirection() || response.status().is_success() {
            return Ok(());
        }

        Err(Self::error(response).await)
    }
}
