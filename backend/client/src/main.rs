use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{
    ApiClient,
    creches::CrechesPanel,
    fingerprint::DeviceFingerprint,
    login::{LoginForm, auto_login},
    overlay::NameOverlay,
    store,
};
use forms::{Campo, Progress};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "CRECHES_URL", default_value = "http://localhost:1111")]
    url: String,

    #[arg(long, env = "CRECHES_CPF")]
    cpf: Option<String>,

    #[arg(long, env = "CRECHES_TELEFONE")]
    telefone: Option<String>,

    /// File keeping the session cookies between runs
    #[arg(long, env = "CRECHES_SESSAO", default_value = ".creches-sessao")]
    sessao: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks whether the stored session is still valid
    Sessao,

    /// Logs in, registering on first use
    Entrar,

    /// Ends the session and forgets the stored cookies
    Sair,

    /// Shows whether the name is still pending
    Status,

    /// Completes the name
    Nome { nome: String },

    /// Shows delivered over promised creches
    Progresso,

    /// Edits one of the counters, admins only
    Editar { campo: Campo, valor: String },
}

/// Logs in with the given CPF and phone, or reuses the stored session without them.
async fn login(api: &ApiClient, args: &Args) -> Result<()> {
    let (Some(cpf), Some(telefone)) = (&args.cpf, &args.telefone) else {
        if auto_login(api).await.is_some() {
            return Ok(());
        }
        bail!("--cpf and --telefone are required when there is no active session");
    };

    let mut form = LoginForm::new();
    form.input_cpf(cpf);
    form.input_telefone(telefone);

    match form.submit(api).await {
        Some(destination) => {
            println!("Entrou como {} ({})", form.cpf, destination.path());
            Ok(())
        }
        None => bail!(form.erro.unwrap_or_default()),
    }
}

fn render(progress: &Progress) -> Result<()> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {msg}")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );

    pb.set_position(progress.percent().floor() as u64);
    pb.finish_with_message(format!(
        "{} ({} de {} creches entregues)",
        progress.label(),
        progress.entregues,
        progress.prometidas
    ));

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let api = ApiClient::new(&args.url)?;
    store::load(&args.sessao, &api)
        .with_context(|| format!("reading {}", args.sessao.display()))?;

    let fingerprint =
        DeviceFingerprint::local(concat!("creches-cli/", env!("CARGO_PKG_VERSION")))
            .send_in_background(&api);

    match &args.command {
        Command::Sessao => match auto_login(&api).await {
            Some(destination) => println!("Sessão ativa ({})", destination.path()),
            None => println!("Sem sessão ativa"),
        },
        Command::Entrar => login(&api, &args).await?,
        Command::Sair => {
            api.logout().await?;
            store::clear(&args.sessao)
                .with_context(|| format!("removing {}", args.sessao.display()))?;
            println!("Sessão encerrada");
        }
        Command::Status => {
            login(&api, &args).await?;

            let mut overlay = NameOverlay::new();
            overlay.load(&api).await;

            if overlay.visible {
                println!("Nome pendente");
            } else {
                println!("Nome completo");
            }
        }
        Command::Nome { nome } => {
            login(&api, &args).await?;

            let mut overlay = NameOverlay::new();
            if !overlay.save(&api, nome).await {
                bail!(overlay.erro.unwrap_or_default());
            }

            println!("Nome salvo");
        }
        Command::Progresso => {
            let mut panel = CrechesPanel::new();
            if !panel.load(&api).await {
                bail!("Erro ao carregar dados");
            }

            render(&panel.progress)?;
        }
        Command::Editar { campo, valor } => {
            login(&api, &args).await?;

            let mut panel = CrechesPanel::new();
            if !panel.load(&api).await {
                bail!("Erro ao carregar dados");
            }

            panel.edit.open(*campo);
            if let Some(label) = panel.edit.label() {
                println!("{label}");
            }

            if !panel.save(&api, valor).await {
                bail!(panel.edit.erro.unwrap_or_default());
            }

            render(&panel.progress)?;
        }
    }

    if !matches!(args.command, Command::Sair) {
        store::save(&args.sessao, &api)
            .with_context(|| format!("writing {}", args.sessao.display()))?;
    }

    // best effort, gives the fingerprint a moment before the runtime shuts down
    let _ = tokio::time::timeout(Duration::from_millis(500), fingerprint).await;

    Ok(())
}
