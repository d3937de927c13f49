//! # Peer Application Library
//!
//! Everything a running peer needs around the shared game core: command-line
//! configuration, UDP links to the other peers, and the macroquad front end.
//!
//! ## Threading
//!
//! macroquad owns the main thread and its frame loop. The UDP transport runs on a tokio
//! runtime in a background thread and talks to the frame loop over two channels:
//! connection events flow in and are drained at the start of every frame, and outbound
//! payloads flow out through each link's command sender. The session itself is only
//! ever touched from the frame loop, so no locking is needed.
//!
//! ## Module Organization
//!
//! - `config`: clap arguments, game topic and local identity
//! - `transport`: UDP peer links with a topic handshake and timeouts
//! - `input`: keyboard and pointer sampling, gesture events
//! - `rendering`: macroquad drawing of a session frame

pub mod config;
pub mod input;
pub mod rendering;
pub mod transport;
