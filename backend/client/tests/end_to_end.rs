//! Page controllers against a real server on an ephemeral port.

use std::time::Duration;

use client::{
    ApiClient, ClientError,
    creches::CrechesPanel,
    fingerprint::DeviceFingerprint,
    login::{Destination, LoginForm, auto_login},
    overlay::NameOverlay,
    store,
};
use forms::{Campo, Progress};
use server::{app, config::Config, state::State};
use tokio::net::TcpListener;

const ADMIN_CPF: &str = "529.982.247-25";
const ADMIN_TELEFONE: &str = "(11) 9 8765-4321";
const CPF: &str = "123.456.789-09";
const TELEFONE: &str = "(21) 9 9876-5432";

async fn spawn_server() -> String {
    let mut config = Config::ephemeral("segredo-de-teste");
    config.admin_cpfs = vec!["52998224725".to_string()];

    let state = State::new(config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    format!("http://{address}")
}

async fn logged_in(base: &str, cpf: &str, telefone: &str) -> (ApiClient, Destination) {
    let api = ApiClient::new(base).unwrap();

    let mut form = LoginForm::new();
    form.input_cpf(cpf);
    form.input_telefone(telefone);
    let destination = form.submit(&api).await.unwrap();

    (api, destination)
}

#[tokio::test]
async fn login_registers_then_auto_logs_in() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();

    assert_eq!(auto_login(&api).await, None);
    assert!(api.csrf_token().is_some());

    let mut form = LoginForm::new();
    form.input_cpf("12345678909");
    form.input_telefone("21998765432");
    assert_eq!(form.submit(&api).await, Some(Destination::Home));

    assert_eq!(auto_login(&api).await, Some(Destination::Home));

    api.logout().await.unwrap();
    assert_eq!(auto_login(&api).await, None);
}

#[tokio::test]
async fn stored_session_survives_a_new_client() {
    let base = spawn_server().await;
    let path = std::env::temp_dir().join(format!("creches-e2e-{}", std::process::id()));

    let (api, _) = logged_in(&base, ADMIN_CPF, ADMIN_TELEFONE).await;
    store::save(&path, &api).unwrap();

    let restored = ApiClient::new(&base).unwrap();
    assert!(store::load(&path, &restored).unwrap());
    assert_eq!(auto_login(&restored).await, Some(Destination::Admin));

    restored.logout().await.unwrap();
    store::clear(&path).unwrap();

    let after_logout = ApiClient::new(&base).unwrap();
    assert!(!store::load(&path, &after_logout).unwrap());
    assert_eq!(auto_login(&after_logout).await, None);
}

#[tokio::test]
async fn admin_lands_on_admin_page() {
    let base = spawn_server().await;

    let (api, destination) = logged_in(&base, ADMIN_CPF, ADMIN_TELEFONE).await;

    assert_eq!(destination, Destination::Admin);
    assert_eq!(auto_login(&api).await, Some(Destination::Admin));
}

#[tokio::test]
async fn server_errors_reach_the_form() {
    let base = spawn_server().await;
    logged_in(&base, CPF, TELEFONE).await;

    let api = ApiClient::new(&base).unwrap();
    let mut form = LoginForm::new();
    form.input_cpf(CPF);
    form.input_telefone("11999999999");

    assert_eq!(form.submit(&api).await, None);
    assert_eq!(form.erro.as_deref(), Some("Telefone incorreto para este CPF"));
}

#[tokio::test]
async fn connection_errors_reach_the_form() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(&format!("http://{address}")).unwrap();
    let mut form = LoginForm::new();
    form.input_cpf(CPF);
    form.input_telefone(TELEFONE);

    assert_eq!(form.submit(&api).await, None);
    assert_eq!(form.erro.as_deref(), Some("Erro de conexão."));
}

#[tokio::test]
async fn name_overlay_follows_status() {
    let base = spawn_server().await;
    let (api, _) = logged_in(&base, CPF, TELEFONE).await;

    let mut overlay = NameOverlay::new();
    overlay.load(&api).await;
    assert!(overlay.visible);

    assert!(!overlay.save(&api, "Jo").await);
    assert_eq!(
        overlay.erro.as_deref(),
        Some("O nome deve ter pelo menos 3 caracteres")
    );
    assert!(overlay.visible);

    assert!(!overlay.save(&api, "Jo4o").await);
    assert_eq!(overlay.erro.as_deref(), Some("Use apenas letras e espaços"));

    assert!(overlay.save(&api, "João Silva").await);
    assert!(!overlay.visible);
    assert!(overlay.erro.is_none());

    let mut reloaded = NameOverlay::new();
    reloaded.load(&api).await;
    assert!(!reloaded.visible);

    let status = api.usuario_status().await.unwrap();
    assert_eq!(status.nome.as_deref(), Some("João Silva"));
}

#[tokio::test]
async fn name_overlay_stays_hidden_when_logged_out() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();

    let mut overlay = NameOverlay::new();
    overlay.load(&api).await;

    assert!(!overlay.visible);
}

#[tokio::test]
async fn admin_edits_counters() {
    let base = spawn_server().await;
    let (api, _) = logged_in(&base, ADMIN_CPF, ADMIN_TELEFONE).await;

    let mut panel = CrechesPanel::new();
    assert!(panel.load(&api).await);
    assert_eq!(panel.progress, Progress::new(0, 0));
    assert_eq!(panel.label(), "0.00%");

    panel.edit.open(Campo::Entregues);
    assert!(!panel.save(&api, "1").await);
    assert_eq!(
        panel.edit.erro.as_deref(),
        Some("Entregues não pode ser maior que prometidas")
    );
    assert!(panel.edit.visible);

    panel.edit.open(Campo::Prometidas);
    assert!(!panel.save(&api, "abc").await);
    assert_eq!(panel.edit.erro.as_deref(), Some("Digite um número válido"));

    assert!(panel.save(&api, "3").await);
    assert!(!panel.edit.visible);

    panel.edit.open(Campo::Entregues);
    assert!(panel.save(&api, "2").await);
    assert_eq!(panel.progress, Progress::new(2, 3));
    assert_eq!(panel.label(), "66.67%");

    let mut visitor = CrechesPanel::new();
    assert!(visitor.load(&ApiClient::new(&base).unwrap()).await);
    assert_eq!(visitor.progress, Progress::new(2, 3));
}

#[tokio::test]
async fn citizens_cannot_edit_counters() {
    let base = spawn_server().await;
    let (api, _) = logged_in(&base, CPF, TELEFONE).await;

    let mut panel = CrechesPanel::new();
    panel.load(&api).await;
    panel.edit.open(Campo::Prometidas);

    assert!(!panel.save(&api, "5").await);
    assert_eq!(panel.edit.erro.as_deref(), Some("Acesso negado"));

    match api.atualizar_creche(Campo::Prometidas, 5).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected 403, got {other:?}"),
    }
}

#[tokio::test]
async fn fingerprint_is_posted_in_background() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();

    let handle = DeviceFingerprint::local("tests").send_in_background(&api);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    api.dispositivo(DeviceFingerprint::local("tests").as_str())
        .await
        .unwrap();

    assert!(api.dispositivo("nope").await.is_err());
}
