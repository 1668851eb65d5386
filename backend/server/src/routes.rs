use std::{path::Path, sync::Arc};

use axum::{
    Json,
    extract::{self, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use forms::{
    cpf, name, only_digits,
    payloads::{
        AtualizarCrecheRequest, Creches, DispositivoRequest, InformacoesRequest, LoginResponse,
        NomeRequest, SessionResponse, StatusResponse, SucessoResponse,
    },
    phone,
};
use tracing::{debug, info, warn};

use crate::{
    crypto::hash_digits,
    database::{DatabaseError, NewUser},
    error::AppError,
    state::State,
    utils::{
        AUTH_COOKIE, SESSION_TOKEN_BYTES, auth_cookie, current_user, is_fingerprint, random_token,
        require_user, session_token, validate_csrf,
    },
};

type AppState = extract::State<Arc<State>>;

fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|_| AppError::MalformedPayload)
}

async fn serve_template(state: &State, template: &str) -> Result<Html<String>, AppError> {
    let path = Path::new(&state.config.templates_dir).join(template);

    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| {
            warn!("Failed to read template {}: {e}", path.display());
            AppError::NotFound
        })
}

pub async fn index_handler(extract::State(state): AppState) -> Result<Html<String>, AppError> {
    serve_template(&state, "index.html").await
}

pub async fn home_handler(
    extract::State(state): AppState,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current_user(&state, &jar).await?.is_none() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(serve_template(&state, "home.html").await?.into_response())
}

pub async fn admin_handler(
    extract::State(state): AppState,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &jar).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    if !user.admin {
        return Ok(Redirect::to("/home").into_response());
    }

    Ok(serve_template(&state, "admin.html").await?.into_response())
}

pub async fn logout_handler(
    extract::State(state): AppState,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(token) = session_token(&jar) {
        state.database.delete_session(token).await?;
    }

    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));

    Ok((jar, Redirect::to("/")))
}

pub async fn session_handler(
    extract::State(state): AppState,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let response = match current_user(&state, &jar).await? {
        Some(user) => (
            StatusCode::OK,
            Json(SessionResponse {
                logado: true,
                admin: Some(user.admin),
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(SessionResponse {
                logado: false,
                admin: None,
            }),
        ),
    };

    Ok(response.into_response())
}

/// Logs in when both CPF and phone belong to the same record, registers when neither is known.
pub async fn informacoes_handler(
    extract::State(state): AppState,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<InformacoesRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), AppError> {
    validate_csrf(&jar, &headers)?;
    let request = payload(body)?;

    let cpf = only_digits(&request.cpf);
    let telefone = only_digits(&request.telefone);

    if cpf.is_empty() || telefone.is_empty() {
        return Err(AppError::MalformedPayload);
    }
    if !cpf::is_valid(&cpf) {
        return Err(AppError::Invalid("CPF inválido.".to_string()));
    }
    if !phone::is_valid(&telefone) {
        return Err(AppError::Invalid("Telefone inválido.".to_string()));
    }

    let nome = request
        .nome
        .as_deref()
        .map(name::validate)
        .transpose()
        .map_err(|e| AppError::Invalid(e.to_string()))?;

    let cpf_hash = hash_digits(&cpf);
    let telefone_hash = hash_digits(&telefone);

    let by_cpf = state.database.find_by_cpf_hash(&cpf_hash).await?;
    let by_telefone = state.database.find_by_telefone_hash(&telefone_hash).await?;
    let listed_admin = state.config.is_admin_cpf(&cpf);

    let (status, user_id, admin) = match (by_cpf, by_telefone) {
        (Some(cpf_id), Some(telefone_id)) if cpf_id != telefone_id => {
            return Err(AppError::Rejected(
                "CPF e telefone não correspondem".to_string(),
            ));
        }
        (Some(user_id), Some(_)) => {
            let user = state.database.get_user(user_id).await?.ok_or_else(|| {
                DatabaseError::Corrupt(format!("indexed user {user_id} has no record"))
            })?;

            if listed_admin && !user.admin {
                info!(user_id, "Promoting listed admin");
                state.database.set_admin(user_id).await?;
            }

            info!(user_id, "Login");
            (StatusCode::OK, user_id, user.admin || listed_admin)
        }
        (Some(_), None) => {
            return Err(AppError::Rejected(
                "Telefone incorreto para este CPF".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(AppError::Rejected(
                "CPF incorreto para este telefone".to_string(),
            ));
        }
        (None, None) => {
            let user = NewUser {
                nome: nome.map(|nome| state.cipher.encrypt(&nome)).transpose()?,
                cpf: state.cipher.encrypt(&cpf)?,
                telefone: state.cipher.encrypt(&telefone)?,
                cpf_hash,
                telefone_hash,
                admin: listed_admin,
            };

            let user_id = state.database.create_user(user).await?;

            info!(user_id, "Registered");
            (StatusCode::CREATED, user_id, listed_admin)
        }
    };

    let token = random_token(SESSION_TOKEN_BYTES);
    state
        .database
        .create_session(&token, user_id, state.config.session_ttl)
        .await?;

    Ok((
        status,
        jar.add(auth_cookie(token)),
        Json(LoginResponse {
            sucesso: true,
            admin,
        }),
    ))
}

pub async fn status_handler(
    extract::State(state): AppState,
    jar: CookieJar,
) -> Result<Json<StatusResponse>, AppError> {
    let user = require_user(&state, &jar).await?;

    let nome = user
        .nome
        .as_deref()
        .map(|nome| state.cipher.decrypt(nome))
        .transpose()?;

    Ok(Json(StatusResponse {
        nome_pendente: nome.is_none(),
        nome,
    }))
}

pub async fn completar_nome_handler(
    extract::State(state): AppState,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<NomeRequest>, JsonRejection>,
) -> Result<Json<SucessoResponse>, AppError> {
    validate_csrf(&jar, &headers)?;
    let user = require_user(&state, &jar).await?;
    let request = payload(body)?;

    let nome = name::validate(&request.nome).map_err(|e| AppError::Invalid(e.to_string()))?;

    if user.nome.is_some() {
        return Err(AppError::Invalid("Nome já cadastrado".to_string()));
    }

    state
        .database
        .set_user_name(user.id, &state.cipher.encrypt(&nome)?)
        .await?;

    info!(user_id = user.id, "Name completed");

    Ok(Json(SucessoResponse { sucesso: true }))
}

pub async fn creches_handler(extract::State(state): AppState) -> Result<Json<Creches>, AppError> {
    let creches = state.database.get_creches().await?.ok_or(AppError::NotFound)?;

    Ok(Json(creches))
}

pub async fn atualizar_creches_handler(
    extract::State(state): AppState,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<AtualizarCrecheRequest>, JsonRejection>,
) -> Result<Json<Creches>, AppError> {
    validate_csrf(&jar, &headers)?;
    let user = require_user(&state, &jar).await?;

    if !user.admin {
        return Err(AppError::NotAdmin);
    }

    let request = payload(body)?;
    let creches = state
        .database
        .update_creches(request.campo, request.valor)
        .await?;

    info!(
        user_id = user.id,
        campo = request.campo.as_str(),
        valor = request.valor,
        "Counter updated"
    );

    Ok(Json(creches))
}

pub async fn dispositivo_handler(
    extract::State(state): AppState,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<DispositivoRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    validate_csrf(&jar, &headers)?;
    let request = payload(body)?;

    if !is_fingerprint(&request.fingerprint) {
        return Err(AppError::MalformedPayload);
    }

    let new = state.database.record_fingerprint(&request.fingerprint).await?;
    debug!(new, "Device fingerprint recorded");

    Ok(StatusCode::NO_CONTENT)
}
