#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod bridge_commands;
mod clipboard;
mod evaluator;
mod launch_config;
mod launch_options;
mod lockdown;
mod log_watch;
mod logging;
mod main_window;
mod process_control;
mod resource_protocol;
mod unsaved_state;
mod window_bounds;
mod window_lifecycle;

pub(crate) use app_constants::*;
pub(crate) use app_types::{AppContext, BridgeReply, BridgeRequest};

fn main() {
    app_runtime::run();
}
