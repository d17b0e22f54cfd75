// Mixer - sums every active voice into the output buffer on the audio thread

use crate::playback::{PlaybackCommand, SharedGain, Voice};
use crossbeam_channel::Receiver;

/// Audio-thread side of the [`PlaybackEngine`](crate::playback::PlaybackEngine).
///
/// Owns the in-flight voices. Polyphony is unlimited and every started voice
/// plays to its end.
pub struct VoiceMixer {
    command_receiver: Receiver<PlaybackCommand>,
    gain: SharedGain,
    voices: Vec<Voice>,
}

impl VoiceMixer {
    pub(crate) fn new(command_receiver: Receiver<PlaybackCommand>, gain: SharedGain) -> Self {
        Self {
            command_receiver,
            gain,
            voices: Vec::new(),
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_receiver.try_recv() {
            match command {
                PlaybackCommand::Start(voice) => self.voices.push(voice),
            }
        }
    }

    /// Overwrites `buffer` with the mix of all active voices.
    ///
    /// Returns the number of frames in the buffer; silence counts as output.
    pub fn fill(&mut self, buffer: &mut [f32], channels: u16) -> usize {
        self.drain_commands();
        buffer.fill(0.0);
        if channels == 0 {
            return 0;
        }

        for voice in self.voices.iter_mut() {
            voice.fill_buffer(buffer, channels);
        }

        let gain = self.gain.get();
        if gain != 1.0 {
            for sample in buffer.iter_mut() {
                *sample *= gain;
            }
        }

        self.voices.retain(|voice| !voice.is_finished());
        buffer.len() / channels as usize
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }
}
