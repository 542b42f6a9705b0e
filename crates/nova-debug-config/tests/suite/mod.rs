
mod launch;
mod launch_json;
mod provide;
mod settings_push;
