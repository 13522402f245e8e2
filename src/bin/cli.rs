//! toolagent CLI
//!
//! Interactive assistant with a one-shot mode for a single query.

use anyhow::{bail, Context};
use clap::Parser;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Input};
use secrecy::ExposeSecret;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use toolagent::agent::{AgentAction, EntryRole, Turn};
use toolagent::config::{mask_secret, preset_names, validate_config};
use toolagent::format::{format_list, format_table, format_timestamp};
use toolagent::tools::default_registry;
use toolagent::{Agent, Config, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "toolagent",
    version = VERSION,
    about = "Answers arithmetic instantly and everything else with an LLM agent and tools",
    long_about = None
)]
struct Cli {
    /// System message preset (default, scientific, code, comparison,
    /// financial, search, visualization) or literal text
    #[arg(long, value_name = "PRESET|TEXT")]
    system_message: Option<String>,

    /// Show routing, timing and debug logs
    #[arg(long)]
    debug: bool,

    /// Maximum number of messages kept in history
    #[arg(long, value_name = "N")]
    max_history: Option<usize>,

    /// Chat model to use
    #[arg(long, env = "MODEL_NAME")]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Show the agent's tool calls after each answer
    #[arg(long)]
    thinking: bool,

    /// Answer this query and exit
    query: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(ref message) = self.system_message {
            config.memory.system_message = Some(message.clone());
        }
        if let Some(n) = self.max_history {
            config.memory.max_messages = n;
        }
        if let Some(ref model) = self.model {
            config.provider.openai.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.provider.openai.temperature = temperature;
        }
        config.agent.debug_mode |= self.debug;
        config.agent.show_thinking |= self.thinking;
    }
}

/// Display toggles for the interactive session
struct Session {
    debug: bool,
    thinking: bool,
}

/// What the REPL does after a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandOutcome {
    Exit,
    Handled,
    Unknown,
}

fn handle_command(input: &str, agent: &mut Agent, session: &mut Session) -> CommandOutcome {
    match input.trim().to_lowercase().as_str() {
        "/exit" | "/quit" | "/q" => return CommandOutcome::Exit,
        "/clear" => {
            agent.clear_history();
            let _ = Term::stdout().clear_screen();
            println!("\n   {} Conversation history cleared.\n", style("✓").green());
        }
        "/history" => print_history(agent),
        "/help" => print_help(),
        "/debug" => {
            session.debug = !session.debug;
            println!("\n   Debug mode {}\n", on_off(session.debug));
        }
        "/thinking" => {
            session.thinking = !session.thinking;
            println!("\n   Thinking display {}\n", on_off(session.thinking));
        }
        _ => return CommandOutcome::Unknown,
    }
    CommandOutcome::Handled
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    cli.apply(&mut config);

    init_tracing(&config);

    let validation = validate_config(&config);
    for warning in &validation.warnings {
        eprintln!("   {} {}", style("⚠").yellow(), warning);
    }
    if !validation.valid {
        for error in &validation.errors {
            eprintln!("   {} {}", style("✗").red(), error);
        }
        bail!("Invalid configuration");
    }

    let tools = default_registry(&config).context("Failed to initialise tools")?;
    let mut agent = Agent::new(&config, tools);
    let mut session = Session {
        debug: config.agent.debug_mode,
        thinking: config.agent.show_thinking,
    };

    if !cli.query.is_empty() {
        let query = cli.query.join(" ");
        let turn = agent.process_message(&query).await?;
        print_turn(&turn, &session, false);
        return Ok(());
    }

    print_banner(&agent, &config);
    run_repl(&mut agent, &mut session).await
}

fn init_tracing(config: &Config) {
    let level = if config.agent.debug_mode {
        "debug"
    } else if config.agent.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("toolagent={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run_repl(agent: &mut Agent, session: &mut Session) -> anyhow::Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        let line: String = match Input::with_theme(&theme)
            .with_prompt(style("You").green().bold().to_string())
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            // EOF or interrupted terminal
            Err(_) => break,
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match handle_command(input, agent, session) {
                CommandOutcome::Exit => break,
                CommandOutcome::Handled => {}
                CommandOutcome::Unknown => println!(
                    "   {} Unknown command. Type {} for help.\n",
                    style("⚠").yellow(),
                    style("/help").cyan()
                ),
            }
            continue;
        }

        print!("   {} ", style("●●●").dim());
        io::stdout().flush()?;

        let result = agent.process_message(input).await;
        let _ = Term::stdout().clear_line();

        match result {
            Ok(turn) => print_turn(&turn, session, true),
            Err(e) => println!("\n   {} Error: {}\n", style("✗").red(), e),
        }
    }

    println!("\n   Goodbye!\n");
    Ok(())
}

fn on_off(enabled: bool) -> console::StyledObject<&'static str> {
    if enabled {
        style("enabled").green()
    } else {
        style("disabled").yellow()
    }
}

fn print_banner(agent: &Agent, config: &Config) {
    println!();
    println!("{}", style("╔══════════════════════════════════════════════════╗").cyan());
    println!("{}", style("║                 toolagent chat                   ║").cyan());
    println!("{}", style("╚══════════════════════════════════════════════════╝").cyan());
    println!();

    match agent.model() {
        Some(model) => println!(
            "   {} Model: {} (key {})",
            style("✓").green(),
            style(model).cyan(),
            style(mask_secret(config.provider.openai.api_key.expose_secret())).dim()
        ),
        None => println!(
            "   {} No OpenAI key: only direct calculations are available",
            style("⚠").yellow()
        ),
    }
    println!("   {}", style("Tools:").dim());
    for line in format_list(&agent.tool_names(), None).lines() {
        println!("     {}", line);
    }
    println!();
    println!("   Type {} for commands.\n", style("/help").yellow());
}

fn print_help() {
    let rows = vec![
        vec!["/exit", "Leave (also /quit, /q)"],
        vec!["/clear", "Clear conversation history and recorded actions"],
        vec!["/history", "Show conversation history"],
        vec!["/help", "Show this help"],
        vec!["/debug", "Toggle routing and timing details"],
        vec!["/thinking", "Toggle display of the agent's tool calls"],
    ];

    println!();
    println!("   {}", style("Available Commands:").cyan().bold());
    for line in format_table(&["Command", "Description"], &rows).lines() {
        println!("   {}", line);
    }

    println!(
        "\n   {} {}\n",
        style("System message presets:").dim(),
        preset_names().join(", ")
    );
}

fn print_history(agent: &Agent) {
    if agent.memory().is_empty() {
        println!("\n   No conversation history yet.\n");
        return;
    }

    println!();
    for entry in agent.history() {
        let role = match entry.role {
            EntryRole::User => style("You".to_string()).green().bold(),
            EntryRole::Assistant => style("Assistant".to_string()).cyan().bold(),
            EntryRole::Error => style(format!(
                "Error ({})",
                entry.error_type.as_deref().unwrap_or("unknown")
            ))
            .red()
            .bold(),
        };
        println!(
            "   {} {}: {}",
            style(format!("[{}]", format_timestamp(&entry.timestamp))).dim(),
            role,
            entry.content
        );
    }
    println!();
}

fn print_turn(turn: &Turn, session: &Session, interactive: bool) {
    if session.thinking {
        let tool_calls: Vec<_> = turn
            .actions
            .iter()
            .filter(|a| matches!(a, AgentAction::Tool { .. }))
            .collect();

        if !tool_calls.is_empty() {
            println!("\n   {}", style("Agent actions:").magenta().bold());
            for action in tool_calls {
                if let AgentAction::Tool { tool, tool_input, log } = action {
                    println!("   {} {} ({})", style("→").magenta(), style(tool).bold(), tool_input);
                    if session.debug {
                        println!("     {}", style(log).dim());
                    }
                }
            }
        }
    }

    if interactive {
        println!("\n   {}: {}\n", style("Assistant").cyan().bold(), turn.answer);
    } else {
        println!("{}", turn.answer);
    }

    if session.debug {
        let mut details = format!(
            "route: {} | time: {:.2}s",
            turn.route,
            turn.elapsed.as_secs_f64()
        );
        if turn.iterations > 0 {
            details.push_str(&format!(" | iterations: {}", turn.iterations));
        }
        if let Some(ref outcome) = turn.outcome {
            details.push_str(&format!(" | outcome: {:?}", outcome));
        }
        eprintln!("   {}\n", style(details).dim());
    }
}
