use color_eyre::Result;
use taskpad_core::scheduler::PermissionState;
use taskpad_notify::NotificationSettings;

use crate::{cli::NotifyCommand, config::Config, tasks};

/// Execute a notification-settings subcommand.
pub async fn handle(cmd: NotifyCommand, config: &Config) -> Result<()> {
    let mut store = tasks::open_store(config).await?;

    match cmd {
        NotifyCommand::Show => print_settings(store.settings()),
        NotifyCommand::Set {
            enabled,
            lead,
            sound,
        } => {
            let current = store.settings();
            let settings = NotificationSettings {
                enabled: enabled.unwrap_or(current.enabled),
                reminder_time: lead.unwrap_or(current.reminder_time),
                sound_enabled: sound.unwrap_or(current.sound_enabled),
            };
            store.update_settings(settings).await;
            println!("Settings updated; reminders rebuilt.");
            print_settings(store.settings());
        }
        NotifyCommand::Permission => {
            let state = store.request_permission().await;
            let label = match state {
                PermissionState::Granted => "granted",
                PermissionState::Denied => "denied",
                PermissionState::Undetermined => "undetermined",
            };
            println!("Notification permission: {label}");
        }
    }

    Ok(())
}

fn print_settings(settings: &NotificationSettings) {
    println!(
        "enabled: {}\nreminder lead: {} min\nsound: {}",
        settings.enabled, settings.reminder_time, settings.sound_enabled
    );
}
