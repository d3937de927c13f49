use clap::Parser;
use log::{error, info};
use macroquad::prelude::*;
use peer::config::{Args, Identity};
use peer::input::InputManager;
use peer::rendering::Renderer;
use peer::transport::{Transport, TransportConfig};
use shared::{Session, WorldConstants};
use std::time::Instant;
use tokio::sync::mpsc;

fn window_conf() -> Conf {
    let world = WorldConstants::default();
    Conf {
        window_title: "Pear Jump".to_owned(),
        window_width: world.width as i32,
        window_height: world.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let topic = args.resolve_topic()?;
    let identity = Identity::generate();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let runtime = tokio::runtime::Runtime::new()?;
    let transport = runtime.block_on(Transport::bind(
        TransportConfig {
            bind: args.bind,
            bootstrap: args.peers.clone(),
            topic,
            identity,
            timeout: args.timeout(),
        },
        events_tx,
    ))?;
    let transport_handle = transport.handle();

    info!("Game topic: {}", topic);
    info!("Share with: --topic {} --peer {}", topic, transport.local_addr()?);
    info!("Controls: arrows or A/D to move, Up/Space to jump, drag the mouse to draw");

    let network = std::thread::spawn(move || runtime.block_on(transport.run()));

    let mut session = Session::start(identity.player_id(), WorldConstants::default());
    let mut input = InputManager::new();
    let mut renderer = Renderer::new(topic.to_hex());

    prevent_quit();

    loop {
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            break;
        }

        while let Ok(event) = events_rx.try_recv() {
            session.handle_event(event);
        }

        let now = Instant::now();
        for gesture in input.update() {
            gesture.apply(&mut session, now);
        }

        session.tick(&input, now, &mut renderer);

        next_frame().await;
    }

    session.teardown();
    transport_handle.shutdown();

    match network.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Transport stopped with error: {}", e),
        Err(_) => error!("Network thread panicked"),
    }

    Ok(())
}
