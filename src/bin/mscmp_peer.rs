use std::cell::RefCell;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use mscmp_client::client::SessionConfig;
use mscmp_client::codec::{Transform, Vec3};
use mscmp_client::error::{fatal, Severity};
use mscmp_client::logging::setup_logging;
use mscmp_client::protocol::{ConnectionState, SystemClock, UdpTransport};
use mscmp_client::state::GameWorld;
use mscmp_client::sync::{ObjectKind, SimpleEntity, AUTOMATIC_ID};
use mscmp_client::{Session, SessionBuilder, SessionEvent};

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
const FIXED_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "mscmp-peer")]
#[command(about = "Run a two-player session peer over UDP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    json_logs: bool,

    /// Print network statistics as JSON on exit
    #[arg(long)]
    stats_json: bool,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    #[arg(long)]
    heartbeat_timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    Host {
        #[arg(long, default_value = "0.0.0.0:7777")]
        bind: SocketAddr,
    },
    Join {
        #[arg(long)]
        host: SocketAddr,
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
    },
}

fn demo_world() -> GameWorld {
    let mut world = GameWorld::new();
    world.mailbox_name = "MAILBOX_HOME".to_string();
    world.clock.hour = 8;
    world.add_door("HOUSE_FRONT", Vec3::new(-10.5, 0.0, 4.2), false);
    world.add_door("GARAGE_SIDE", Vec3::new(-14.0, 0.0, 9.8), false);
    world.add_light_switch("KITCHEN", Vec3::new(-8.1, 1.2, 2.0), false);
    world.add_light_switch("SAUNA", Vec3::new(-3.4, 1.2, 12.5), false);
    for (name, x) in [("SATSUMA", 0.0), ("GIFU", 8.0), ("HAYOSIKO", 16.0)] {
        if let Err(e) = world.vehicles.register(name, Transform::at(Vec3::new(x, 0.0, -20.0))) {
            tracing::warn!(error = %e, vehicle = name, "failed to register demo vehicle");
        }
    }
    world
}

fn log_event(event: &SessionEvent) {
    match event.user_message() {
        Some(text) => tracing::warn!(?event, "{text}"),
        None => tracing::info!(?event, "session event"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = SessionConfig::load_or_default(cli.config.as_deref())?;
    if let Some(timeout) = cli.heartbeat_timeout_ms {
        config.heartbeat_timeout_ms = timeout;
    }
    setup_logging(&config.logging, cli.json_logs)?;

    let (bind, host_addr) = match cli.command {
        Commands::Host { bind } => (bind, None),
        Commands::Join { host, bind } => (bind, Some(host)),
    };
    let mut transport = UdpTransport::bind(bind).await?;
    tracing::info!(addr = %transport.local_addr()?, "socket bound");
    let invite = host_addr.map(|addr| transport.add_peer(addr).0.to_string());

    let mut session = SessionBuilder::new(transport)
        .clock(SystemClock)
        .config(config)
        .world(demo_world())
        .build();

    if let Err(error) = session.verify_world(&["SUN", "MAILBOX", "Clouds"]) {
        if error.severity() == Severity::AssertionFatal {
            fatal(&error);
        }
        return Err(error.into());
    }

    let boat = SimpleEntity::shared(Transform::at(Vec3::new(30.0, 0.0, 30.0)));
    session.register_object(AUTOMATIC_ID, ObjectKind::Boat, boat.clone())?;

    match &invite {
        None => {
            let lobby = session.create_session()?;
            tracing::info!(%lobby, "waiting for a player to join");
        }
        Some(invite) => {
            session.join_session(invite)?;
        }
    }

    run(&mut session, boat, cli.duration_secs.map(Duration::from_secs)).await;

    if session.is_online() {
        session.disconnect();
    }
    if cli.stats_json {
        println!("{}", serde_json::to_string_pretty(session.stats())?);
    }
    Ok(())
}

async fn run(session: &mut Session, boat: Rc<RefCell<SimpleEntity>>, duration: Option<Duration>) {
    let started = Instant::now();
    let mut frame = tokio::time::interval(FRAME_INTERVAL);
    let mut fixed = tokio::time::interval(FIXED_INTERVAL);
    let mut walked = 0.0f32;

    loop {
        tokio::select! {
            _ = frame.tick() => {
                walked += 0.02;
                session.set_local_transform(Transform::at(Vec3::new(walked.sin() * 3.0, 0.0, walked.cos() * 3.0)), None);
                session.update();
                for event in session.drain_events() {
                    log_event(&event);
                }
            }
            _ = fixed.tick() => {
                if session.is_host() {
                    let mut boat = boat.borrow_mut();
                    boat.velocity = Vec3::new(0.5, 0.0, 0.0);
                    boat.transform.position.x += 0.01;
                }
                session.fixed_update();
            }
        }

        if matches!(session.state(), ConnectionState::Idle | ConnectionState::Disconnected) {
            tracing::info!(state = ?session.state(), "session over");
            break;
        }
        if duration.is_some_and(|d| started.elapsed() >= d) {
            tracing::info!("run time elapsed");
            break;
        }
    }
}
