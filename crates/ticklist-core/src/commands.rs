use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::filter::Filter;
use crate::render::Renderer;
use crate::session::Session;

pub fn known_command_names() -> Vec<&'static str> {
    vec!["add", "list", "info", "toggle", "delete", "help", "version"]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, cfg, renderer, inv))]
pub fn dispatch(
    session: &mut Session,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "add" => cmd_add(session, &inv.command_args),
        "list" => cmd_list(session, cfg, renderer, &inv.command_args),
        "info" => cmd_info(session, renderer, &inv.command_args),
        "toggle" => cmd_toggle(session, &inv.command_args),
        "delete" => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            cmd_delete(session, cfg, &inv.command_args, &mut input)
        }
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(session, args))]
fn cmd_add(session: &mut Session, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let title = args.first().cloned().unwrap_or_default();
    let description = args.get(1..).unwrap_or_default().join(" ");
    let id = session
        .add_todo(title, description)
        .ok_or_else(|| anyhow!("no todo ids left; cannot add"))?;

    debug!(count = session.todos().len(), "todo added");
    println!("Created todo {id}.");
    Ok(())
}

#[instrument(skip(session, cfg, renderer, args))]
fn cmd_list(
    session: &mut Session,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command list");

    let filter = args
        .first()
        .map(|raw| Filter::parse_lenient(raw))
        .unwrap_or(cfg.default_filter);
    session.set_filter(filter);

    let visible = session.visible();
    renderer.print_todo_table(&visible, session.filter())
}

#[instrument(skip(session, renderer, args))]
fn cmd_info(session: &Session, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command info");

    let id = parse_id(args)?;
    match session.details(id) {
        Some(todo) => renderer.print_todo_info(todo),
        None => {
            println!("No todo {id}.");
            Ok(())
        }
    }
}

#[instrument(skip(session, args))]
fn cmd_toggle(session: &mut Session, args: &[String]) -> anyhow::Result<()> {
    info!("command toggle");

    let id = parse_id(args)?;
    if session.toggle_status(id) {
        let status = session.details(id).map(|t| t.status).unwrap_or_default();
        println!("Todo {id} is now {status}.");
    } else {
        println!("No todo {id}.");
    }
    Ok(())
}

#[instrument(skip(session, cfg, args, input))]
fn cmd_delete<R: BufRead>(
    session: &mut Session,
    cfg: &Config,
    args: &[String],
    input: &mut R,
) -> anyhow::Result<()> {
    info!("command delete");

    let assume_yes = args.iter().any(|a| a == "--yes" || a == "-y");
    let positional: Vec<String> = args
        .iter()
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .collect();
    let id = parse_id(&positional)?;

    let Some(todo) = session.request_delete(id) else {
        println!("No todo {id}.");
        return Ok(());
    };

    if cfg.confirmation && !assume_yes {
        print!("Delete todo {} '{}'? (yes/no) ", todo.id, todo.title);
        io::stdout().flush()?;
        if !read_confirmation(input)? {
            session.cancel_delete();
            println!("Todo {id} kept.");
            return Ok(());
        }
    }

    if session.confirm_delete().is_some() {
        println!("Deleted todo {id}.");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Commands: add <title> [description...], list [all|active|done], info <id>, toggle <id>, delete <id> [--yes], version");
    Ok(())
}

fn parse_id(args: &[String]) -> anyhow::Result<u64> {
    let raw = args.first().ok_or_else(|| anyhow!("missing todo id"))?;
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("invalid todo id: {raw}"))
}

fn read_confirmation<R: BufRead>(input: &mut R) -> anyhow::Result<bool> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed reading confirmation")?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
