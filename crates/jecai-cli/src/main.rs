mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use jecai_ai::gemini::{DEFAULT_MODEL, DEFAULT_TIMEOUT};
use jecai_ai::{Agents, Evidence, GeminiClient, PetitionRequest};
use jecai_core::extract::{SEE_LINK, VALUE_PENDING};
use jecai_core::history::{self, HistoryRecord};
use jecai_core::{CaseNumber, CaseStatus, Court, Marker, NewCase, extract, extract_or};
use jecai_store::CaseStore;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "jecai", version, about = "Case intake and petition drafting for small-claims courts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// DuckDB file; in-memory when unset.
    #[arg(long, env = "JECAI_DB")]
    db: Option<PathBuf>,
}

#[derive(Args)]
struct ModelArgs {
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: String,
    #[arg(long, env = "JECAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "JECAI_GEMINI_URL")]
    base_url: Option<String>,
    /// Request timeout in seconds. Petition drafting always allows 600.
    #[arg(long, env = "JECAI_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Pull a tagged value or a CNJ number out of generated text.
    Extract {
        #[command(subcommand)]
        target: ExtractTarget,
    },
    /// Read and write history blobs.
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },
    /// Check a CNJ case number's shape and check digits.
    Cnj { number: String },
    /// Draft a petition for a new client and save the case.
    Intake(IntakeArgs),
    /// Manage saved cases.
    Cases {
        #[command(flatten)]
        store: StoreArgs,
        #[command(subcommand)]
        cmd: CasesCmd,
    },
    /// Jurimetrics profile for a judge.
    Judge {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long)]
        name: String,
        #[arg(long)]
        court: String,
        /// Reference case number.
        #[arg(long)]
        case: Option<String>,
    },
    /// WhatsApp message for a client after a phase change.
    Message {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long)]
        client: String,
        #[arg(long)]
        phase: String,
        /// Hearing date, YYYY-MM-DD.
        #[arg(long)]
        hearing: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ExtractTarget {
    /// `[[LABEL: payload]]` sentinel.
    Value {
        #[arg(long, default_value = jecai_core::extract::VALUE_LABEL)]
        label: String,
        #[arg(long, default_value = VALUE_PENDING)]
        fallback: String,
        /// Report why nothing was found instead of printing the fallback.
        #[arg(long)]
        explain: bool,
        file: Option<PathBuf>,
    },
    /// CNJ process number.
    Cnj {
        #[arg(long, default_value = SEE_LINK)]
        fallback: String,
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HistoryCmd {
    /// Join LABEL=VALUE pairs into a legacy blob.
    Encode {
        #[arg(value_parser = parse_pair, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Print one labelled field of a blob.
    Decode {
        label: String,
        /// Printed when the label is absent; the whole blob otherwise.
        #[arg(long)]
        fallback: Option<String>,
        file: Option<PathBuf>,
    },
    /// Print a blob as a structured JSON record.
    Parse {
        /// Print the legacy `LABEL: value||...` form instead of JSON.
        #[arg(long)]
        legacy: bool,
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IntakeArgs {
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long)]
    client: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "TJRJ")]
    court: Court,
    /// Client's account of the facts; read from stdin when omitted.
    #[arg(long)]
    facts: Option<String>,
    /// Lawyer's estimate, e.g. "R$ 5.000,00".
    #[arg(long)]
    estimate: Option<String>,
    /// Screenshots, photos, or voice notes.
    #[arg(long = "evidence")]
    evidence: Vec<PathBuf>,
    /// Also write the draft to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CasesCmd {
    List,
    /// Show one case by id, or the latest case of a client.
    Show {
        #[arg(required_unless_present = "client", conflicts_with = "client")]
        id: Option<i64>,
        #[arg(long)]
        client: Option<String>,
    },
    /// Set a case's status and log the change.
    Status { id: i64, status: CaseStatus },
    /// Attach the CNJ number assigned on filing.
    Link { id: i64, number: String },
    /// Add a free-text note to a case's history.
    Note { id: i64, note: String },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected LABEL=VALUE, got {s:?}"))
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn open_store(args: &StoreArgs) -> anyhow::Result<CaseStore> {
    let store = match &args.db {
        Some(path) => CaseStore::open_persistent(path)
            .with_context(|| format!("opening {}", path.display()))?,
        None => {
            warn!("no database configured, cases will not persist");
            CaseStore::open()?
        }
    };
    Ok(store)
}

fn agents(args: &ModelArgs) -> Agents {
    let mut client = GeminiClient::new(args.api_key.clone(), args.model.clone())
        .with_timeout(Duration::from_secs(args.timeout));
    if let Some(url) = &args.base_url {
        client = client.with_base_url(url);
    }
    Agents::new(client)
}

fn load_evidence(paths: &[PathBuf]) -> anyhow::Result<Vec<Evidence>> {
    paths
        .iter()
        .map(|path| {
            let data =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Evidence::from_file(&name, data)
                .ok_or_else(|| anyhow!("unsupported evidence format: {}", path.display()))
        })
        .collect()
}

async fn intake(args: IntakeArgs) -> anyhow::Result<()> {
    if let Court::Other(name) = &args.court {
        let known = Court::INTAKE_CHOICES.map(|c| c.to_string());
        warn!(court = %name, known = ?known, "court is not one of the intake choices");
    }
    let facts = match args.facts {
        Some(f) => f,
        None => read_input(None)?,
    };
    if facts.trim().is_empty() {
        bail!("the client's account of the facts is empty");
    }

    let request = PetitionRequest {
        client_name: args.client.clone(),
        court: Some(args.court.clone()),
        facts: facts.clone(),
        estimated_value: args.estimate,
        evidence: load_evidence(&args.evidence)?,
    };
    let draft = agents(&args.model)
        .draft_petition(&request)
        .await
        .context("drafting petition")?;

    let mut history = HistoryRecord::new(facts);
    history.set_value(&draft.value);
    history.push_event("Petição gerada via IA.");

    let case = NewCase {
        client_name: args.client,
        client_phone: args.phone,
        court: args.court,
        status: CaseStatus::PetitionReady,
        history: history.to_blob()?,
    };
    // A failed save must not lose the draft.
    match open_store(&args.store).and_then(|s| Ok(s.insert(&case)?)) {
        Ok(id) => info!(id, "intake complete"),
        Err(e) => error!(error = %e, "could not save case"),
    }

    if let Some(out) = &args.out {
        std::fs::write(out, &draft.text).with_context(|| format!("writing {}", out.display()))?;
        info!(path = %out.display(), "draft written");
    }
    println!("{}", draft.text);
    println!();
    println!("Valor da causa: {}", history.display_value());
    Ok(())
}

fn cases(store: &StoreArgs, cmd: CasesCmd) -> anyhow::Result<()> {
    let store = open_store(store)?;
    match cmd {
        CasesCmd::List => {
            let cases = store.list()?;
            if cases.is_empty() {
                println!("Nenhum processo cadastrado.");
            } else {
                print!("{}", display::case_table(&cases));
                println!("{} processo(s)", store.count()?);
            }
        }
        CasesCmd::Show { id, client } => {
            let case = match (id, client) {
                (Some(id), _) => store.get(id)?,
                (None, Some(name)) => store
                    .find_by_client(&name)?
                    .ok_or_else(|| anyhow!("no case for client {name:?}"))?,
                (None, None) => bail!("give a case id or --client"),
            };
            print!("{}", display::case_card(&case));
        }
        CasesCmd::Status { id, status } => {
            store.set_status_with_event(id, &status, &format!("Status alterado para {status}."))?;
            println!("#{id}: {status}");
        }
        CasesCmd::Note { id, note } => {
            let history = store.append_event(id, &note)?;
            println!("#{id}: {} eventos", history.events.len());
        }
        CasesCmd::Link { id, number } => {
            let number: CaseNumber = number.parse()?;
            if !number.has_valid_check_digits() {
                warn!(%number, expected = number.expected_check_digits(), "check digits do not match");
            }
            store.set_status_with_event(
                id,
                &CaseStatus::Filed,
                &format!("Processo {number} vinculado."),
            )?;
            println!("#{id}: processo {number} vinculado");
        }
    }
    Ok(())
}

fn history_cmd(cmd: HistoryCmd) -> anyhow::Result<()> {
    match cmd {
        HistoryCmd::Encode { fields } => println!("{}", history::encode(&fields)),
        HistoryCmd::Decode {
            label,
            fallback,
            file,
        } => {
            let blob = read_input(file.as_deref())?;
            let blob = blob.trim_end_matches('\n');
            let value = match &fallback {
                Some(f) => history::decode_or(blob, &label, f),
                None => history::decode(blob, &label),
            };
            println!("{value}");
        }
        HistoryCmd::Parse { legacy, file } => {
            let blob = read_input(file.as_deref())?;
            let record = HistoryRecord::parse(blob.trim_end_matches('\n'))?;
            if legacy {
                println!("{}", record.to_legacy());
            } else {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
    }
    Ok(())
}

fn extract_cmd(target: ExtractTarget) -> anyhow::Result<()> {
    match target {
        ExtractTarget::Value {
            label,
            fallback,
            explain,
            file,
        } => {
            let text = read_input(file.as_deref())?;
            let marker = Marker::sentinel(&label)?;
            if explain {
                match extract(&text, &marker) {
                    jecai_core::Extraction::Found(v) => println!("{v}"),
                    jecai_core::Extraction::Missing(reason) => bail!("{marker}: {reason}"),
                }
            } else {
                println!("{}", extract_or(&text, &marker, &fallback));
            }
        }
        ExtractTarget::Cnj { fallback, file } => {
            let text = read_input(file.as_deref())?;
            println!("{}", extract_or(&text, &Marker::CaseNumber, &fallback));
        }
    }
    Ok(())
}

fn cnj_check(raw: &str) -> anyhow::Result<()> {
    let number: CaseNumber = raw.parse()?;
    println!("{number}");
    println!("  sequencial   {:07}", number.sequence);
    println!("  ano          {}", number.year);
    println!("  segmento     {}", number.segment);
    println!("  tribunal     {:02}", number.court);
    println!("  origem       {:04}", number.origin);
    if number.has_valid_check_digits() {
        println!("  dígitos      {:02} (ok)", number.check_digits);
        Ok(())
    } else {
        bail!(
            "check digits {:02} do not match expected {:02}",
            number.check_digits,
            number.expected_check_digits()
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("jecai v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Extract { target } => extract_cmd(target)?,
        Command::History { cmd } => history_cmd(cmd)?,
        Command::Cnj { number } => cnj_check(&number)?,
        Command::Intake(args) => intake(args).await?,
        Command::Cases { store, cmd } => cases(&store, cmd)?,
        Command::Judge {
            model,
            name,
            court,
            case,
        } => {
            let case = case.map(|c| c.parse::<CaseNumber>()).transpose()?;
            let profile = agents(&model)
                .judge_profile(&name, &court, case.as_ref())
                .await?;
            println!("{profile}");
        }
        Command::Message {
            model,
            client,
            phase,
            hearing,
        } => {
            let hearing = hearing.map(|d| d.format("%d/%m/%Y").to_string());
            let message = agents(&model)
                .client_message(&phase, &client, hearing.as_deref())
                .await?;
            println!("{message}");
        }
    }
    Ok(())
}
