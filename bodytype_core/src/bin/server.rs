use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bevy_ecs::prelude::*;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use bodytype_core::chat::{error_line, status_lines};
use bodytype_core::host::ecs::{skin_type_registry, spawn_player, WorldPlayer};
use bodytype_core::host::text::TextMessage;
use bodytype_core::host::ChatMessage;
use bodytype_core::{
    command_bind_from_env, execute_mode, handle_page_action, load_override_config_from_env,
    state_path_from_env, AffordanceAttacher, AppearanceOverrideService, PageOutcome,
    PreferenceStore,
};
use bodytype_runtime::{
    parse_bodytype_command, BodyTypeCommand, CommandParseError, PageAction, PageEventData,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_metadata) = load_override_config_from_env();
    let state_path = state_path_from_env();
    let store = Arc::new(PreferenceStore::open(&state_path));
    let service = AppearanceOverrideService::new(
        store,
        Arc::clone(&config),
        Arc::new(skin_type_registry()),
    );
    let attacher = AffordanceAttacher::new(config.affordance().clone());

    let command_bind = command_bind_from_env();
    let requests = match spawn_command_listener(command_bind) {
        Ok(requests) => requests,
        Err(err) => {
            error!(
                target: "bodytypes::server",
                %command_bind,
                error = %err,
                "command_listener.bind_failed"
            );
            std::process::exit(1);
        }
    };

    info!(
        target: "bodytypes::server",
        %command_bind,
        state_path = %state_path.display(),
        config_path = ?config_metadata.path(),
        "server.ready"
    );

    let mut world = World::new();
    let mut players: HashMap<Uuid, Entity> = HashMap::new();

    while let Ok(request) = requests.recv() {
        let lines = match request.input {
            Ok(input) => {
                let user = request.user;
                let entity = *players.entry(user).or_insert_with(|| {
                    info!(target: "bodytypes::server", %user, "player.spawned");
                    spawn_player(&mut world, user)
                });
                let mut player = WorldPlayer::new(&mut world, entity);
                respond(&service, &attacher, user, input, &mut player)
            }
            Err(err) => vec![error_line(&attacher, &err.to_string())],
        };

        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        if request.reply.send(rendered).is_err() {
            warn!(target: "bodytypes::server", user = %request.user, "client.gone");
        }
    }
}

fn respond(
    service: &AppearanceOverrideService,
    attacher: &AffordanceAttacher,
    user: Uuid,
    input: Input,
    player: &mut WorldPlayer<'_>,
) -> Vec<TextMessage> {
    match input {
        Input::Command(BodyTypeCommand::OpenPage) => {
            status_lines(attacher, service.is_enabled(user))
        }
        Input::Command(BodyTypeCommand::Mode(mode)) => {
            execute_mode(service, mode, user, player).to_messages(attacher)
        }
        Input::Page(action) => match handle_page_action(service, action, user, player) {
            PageOutcome::Updated { reply, status } => {
                let mut lines = reply.to_messages(attacher);
                let mut label = TextMessage::raw(&status.text);
                attacher.apply_color(&mut label, status.color);
                lines.push(label);
                lines
            }
            PageOutcome::Closed => vec![TextMessage::raw("Page closed.")],
            PageOutcome::Ignored => Vec::new(),
        },
    }
}

#[derive(Debug)]
enum Input {
    Command(BodyTypeCommand),
    Page(Option<PageAction>),
}

#[derive(Debug, Error)]
enum RequestError {
    #[error("expected `<uuid> <command>`")]
    MissingCommand,
    #[error("invalid user id '{0}'")]
    InvalidUser(String),
    #[error("invalid page event: {0}")]
    PageEvent(#[from] serde_json::Error),
    #[error(transparent)]
    Command(#[from] CommandParseError),
}

struct Request {
    user: Uuid,
    input: Result<Input, RequestError>,
    reply: Sender<Vec<String>>,
}

/// `<uuid> /bodytype ...`, `<uuid> page <Action>` or
/// `<uuid> event {"Action":"Toggle"}`.
fn parse_request(line: &str) -> Result<(Uuid, Result<Input, RequestError>), RequestError> {
    let (user, rest) = line
        .split_once(char::is_whitespace)
        .ok_or(RequestError::MissingCommand)?;
    let user = Uuid::parse_str(user).map_err(|_| RequestError::InvalidUser(user.to_string()))?;
    let rest = rest.trim();

    let input = match rest.split_once(char::is_whitespace) {
        Some(("page", action)) => Ok(Input::Page(PageAction::parse(action.trim()))),
        Some(("event", payload)) => serde_json::from_str::<PageEventData>(payload)
            .map(|event| Input::Page(event.page_action()))
            .map_err(RequestError::from),
        _ => parse_bodytype_command(rest)
            .map(Input::Command)
            .map_err(RequestError::from),
    };
    Ok((user, input))
}

fn spawn_command_listener(bind_addr: SocketAddr) -> io::Result<Receiver<Request>> {
    let listener = TcpListener::bind(bind_addr)?;
    listener.set_nonblocking(true)?;

    let (sender, receiver) = unbounded::<Request>();
    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!(target: "bodytypes::server", %addr, "client.connected");
                let sender = sender.clone();
                thread::spawn(move || handle_client(stream, sender));
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                warn!(target: "bodytypes::server", error = %err, "client.accept_failed");
                thread::sleep(Duration::from_millis(200));
            }
        }
    });

    Ok(receiver)
}

fn handle_client(stream: TcpStream, sender: Sender<Request>) {
    if let Err(err) = stream.set_nonblocking(false) {
        warn!(target: "bodytypes::server", error = %err, "client.setup_failed");
        return;
    }
    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(err) => {
            warn!(target: "bodytypes::server", error = %err, "client.setup_failed");
            return;
        }
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let lines = match parse_request(trimmed) {
                    Ok((user, input)) => {
                        let (reply_tx, reply_rx) = bounded(1);
                        let request = Request {
                            user,
                            input,
                            reply: reply_tx,
                        };
                        if sender.send(request).is_err() {
                            break;
                        }
                        match reply_rx.recv() {
                            Ok(lines) => lines,
                            Err(_) => break,
                        }
                    }
                    Err(err) => {
                        warn!(target: "bodytypes::server", line = trimmed, error = %err, "request.invalid");
                        vec![format!("error: {err}")]
                    }
                };
                if let Err(err) = write_lines(&mut writer, &lines) {
                    warn!(target: "bodytypes::server", error = %err, "client.write_failed");
                    break;
                }
            }
            Err(err) => {
                warn!(target: "bodytypes::server", error = %err, "client.read_failed");
                break;
            }
        }
    }
}

fn write_lines(writer: &mut TcpStream, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}
