//! Handle all the raw input directly from the end user.

use std::io::Read as _;

use color_eyre::eyre::Result;

use crate::keybindings::KeybindingAction;

/// Bytes from STDIN
pub type BytesFromSTDIN = [u8; 128];

/// Handle input from the user
pub(crate) struct RawInput {
    /// The main protocol channel.
    protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
}

impl RawInput {
    /// Start a thread to listen and parse the end user's STDIN and forward any bound keys to the
    /// rest of the application.
    pub fn start(
        protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    ) -> std::thread::JoinHandle<std::result::Result<(), color_eyre::eyre::Error>> {
        // The Tokio docs actually suggest using `std::thread` to listen on STDIN for interactive
        // applications.
        std::thread::spawn(move || -> Result<()> {
            let protocol_for_shutdown = protocol_tx.clone();
            let input = Self { protocol_tx };
            let result = input.consume_stdin();
            crate::run::broadcast_protocol_end(&protocol_for_shutdown);
            result
        })
    }

    /// Listen to the end user's STDIN until they ask to quit.
    fn consume_stdin(&self) -> Result<()> {
        tracing::debug!("Starting to listen on STDIN");

        let stdin = std::io::stdin();
        let mut reader = std::io::BufReader::new(stdin);
        let mut parser = termwiz::input::InputParser::new();
        let mut is_quitting = false;

        while !is_quitting {
            let mut buffer: BytesFromSTDIN = [0; 128];
            let count = reader.read(&mut buffer[..])?;
            if count == 0 {
                tracing::debug!("STDIN closed");
                break;
            }

            let Some(bytes) = buffer.get(0..count) else {
                tracing::warn!("Couldn't get bytes from STDIN input buffer");
                continue;
            };
            tracing::trace!("Received STDIN input: {bytes:x?}");

            parser.parse(
                bytes,
                |event| {
                    is_quitting |= self.parsed_event_callback(&event);
                },
                false,
            );
        }

        tracing::debug!("Leaving STDIN loop");
        Ok(())
    }

    /// The callback for when the input parser detects known keyboard/mouse events. Returns
    /// whether the user asked to quit.
    fn parsed_event_callback(&self, event: &termwiz::input::InputEvent) -> bool {
        tracing::trace!("Parsed input event: {event:?}");

        let Some(action) = KeybindingAction::from_event(event) else {
            return false;
        };
        if action == KeybindingAction::Quit {
            tracing::debug!("User asked to quit");
            return true;
        }

        let result = self
            .protocol_tx
            .send(crate::run::Protocol::KeybindEvent(action));
        if let Err(error) = result {
            tracing::error!("Error sending input event from thread to task: {error:?}");
        }
        false
    }
}
