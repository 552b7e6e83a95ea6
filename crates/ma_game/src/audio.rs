//! Fire-and-forget sound triggers.
//!
//! Gameplay code pushes commands into an [`AudioQueue`] during a step; the
//! binary drains the queue into whatever [`AudioBackend`] it runs with. No
//! game logic waits on playback.
//!
//! [`RodioAudioBackend`] plays through the default output device. Without a
//! device the binary falls back to [`LogAudioBackend`].

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::source::Buffered;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

/// Maximum commands kept per step; extras are dropped.
pub const MAX_COMMANDS_PER_STEP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Music,
    Jump,
    Coin,
    Hurt,
    Portal,
    Victory,
}

impl SoundCue {
    pub const ALL: [SoundCue; 6] = [
        SoundCue::Music,
        SoundCue::Jump,
        SoundCue::Coin,
        SoundCue::Hurt,
        SoundCue::Portal,
        SoundCue::Victory,
    ];

    pub fn asset_path(self) -> &'static str {
        match self {
            SoundCue::Music => "sounds/menu.wav",
            SoundCue::Jump => "sounds/jump.wav",
            SoundCue::Coin => "sounds/coin.wav",
            SoundCue::Hurt => "sounds/hurt.wav",
            SoundCue::Portal => "sounds/portal.wav",
            SoundCue::Victory => "sounds/victory.wav",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    PlayOnce(SoundCue),
    PlayLoop(SoundCue),
    Stop(SoundCue),
}

#[derive(Debug, Default)]
pub struct AudioQueue {
    commands: Vec<AudioCommand>,
    dropped: usize,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_once(&mut self, cue: SoundCue) {
        self.push(AudioCommand::PlayOnce(cue));
    }

    pub fn play_loop(&mut self, cue: SoundCue) {
        self.push(AudioCommand::PlayLoop(cue));
    }

    pub fn stop(&mut self, cue: SoundCue) {
        self.push(AudioCommand::Stop(cue));
    }

    fn push(&mut self, command: AudioCommand) {
        if self.commands.len() >= MAX_COMMANDS_PER_STEP {
            self.dropped += 1;
            return;
        }
        self.commands.push(command);
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[AudioCommand] {
        &self.commands
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hand every queued command to `backend` in order and clear the queue.
    pub fn drain_into(&mut self, backend: &mut dyn AudioBackend) {
        if self.dropped > 0 {
            log::debug!("Dropped {} audio command(s) this step", self.dropped);
            self.dropped = 0;
        }
        for command in self.commands.drain(..) {
            backend.execute(command);
        }
    }
}

pub trait AudioBackend {
    fn execute(&mut self, command: AudioCommand);
}

/// A session queue drains into the controller queue.
impl AudioBackend for AudioQueue {
    fn execute(&mut self, command: AudioCommand) {
        self.push(command);
    }
}

/// Backend that only reports what would play. Used when no output device is
/// wired up; missing sounds are never an error.
#[derive(Debug, Default)]
pub struct LogAudioBackend {
    looping: Vec<SoundCue>,
}

impl LogAudioBackend {
    #[cfg(test)]
    pub fn is_looping(&self, cue: SoundCue) -> bool {
        self.looping.contains(&cue)
    }
}

impl AudioBackend for LogAudioBackend {
    fn execute(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::PlayOnce(cue) => log::debug!("Sound: {}", cue.asset_path()),
            AudioCommand::PlayLoop(cue) => {
                if !self.looping.contains(&cue) {
                    self.looping.push(cue);
                    log::info!("Looping sound: {}", cue.asset_path());
                }
            }
            AudioCommand::Stop(cue) => {
                self.looping.retain(|&c| c != cue);
                log::debug!("Stopped sound: {}", cue.asset_path());
            }
        }
    }
}

/// A decoded clip that can be cloned cheaply for every playback.
pub type Clip = Buffered<Decoder<BufReader<File>>>;

pub fn load_clip(path: &Path) -> Result<Clip, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open sound {}: {e}", path.display()))?;
    let decoder = Decoder::try_from(file)
        .map_err(|e| format!("Failed to decode sound {}: {e}", path.display()))?;
    Ok(decoder.buffered())
}

/// Plays cues on the default output device. Clips load on first use; a cue
/// whose file is missing or undecodable is logged once and stays silent.
pub struct RodioAudioBackend {
    stream: OutputStream,
    root: PathBuf,
    clips: HashMap<SoundCue, Option<Clip>>,
    /// One sink per looping cue so `Stop` can end it.
    loops: HashMap<SoundCue, Sink>,
}

impl RodioAudioBackend {
    /// Open the default device and decode every cue under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, String> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| format!("Failed to open audio output: {e}"))?;
        let mut backend = Self {
            stream,
            root: root.into(),
            clips: HashMap::new(),
            loops: HashMap::new(),
        };
        for cue in SoundCue::ALL {
            backend.clip(cue);
        }
        Ok(backend)
    }

    fn clip(&mut self, cue: SoundCue) -> Option<Clip> {
        let root = &self.root;
        self.clips
            .entry(cue)
            .or_insert_with(|| match load_clip(&root.join(cue.asset_path())) {
                Ok(clip) => {
                    log::info!("Sound loaded: {}", cue.asset_path());
                    Some(clip)
                }
                Err(err) => {
                    log::warn!("{err}. Cue stays silent.");
                    None
                }
            })
            .clone()
    }
}

impl AudioBackend for RodioAudioBackend {
    fn execute(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::PlayOnce(cue) => {
                if let Some(clip) = self.clip(cue) {
                    let sink = Sink::connect_new(self.stream.mixer());
                    sink.append(clip);
                    sink.detach();
                }
            }
            AudioCommand::PlayLoop(cue) => {
                if self.loops.contains_key(&cue) {
                    return;
                }
                if let Some(clip) = self.clip(cue) {
                    let sink = Sink::connect_new(self.stream.mixer());
                    sink.append(clip.repeat_infinite());
                    self.loops.insert(cue, sink);
                }
            }
            AudioCommand::Stop(cue) => {
                if let Some(sink) = self.loops.remove(&cue) {
                    sink.stop();
                }
            }
        }
    }
}

/// The device backend when one opens, else the logging one.
pub fn open_backend(root: &Path) -> Box<dyn AudioBackend> {
    match RodioAudioBackend::open(root) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            log::warn!("{err}. Sound is disabled.");
            Box::new(LogAudioBackend::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<AudioCommand>);

    impl AudioBackend for Recorder {
        fn execute(&mut self, command: AudioCommand) {
            self.0.push(command);
        }
    }

    #[test]
    fn drain_preserves_order_and_empties_queue() {
        let mut queue = AudioQueue::new();
        queue.play_loop(SoundCue::Music);
        queue.play_once(SoundCue::Jump);
        queue.stop(SoundCue::Music);

        let mut recorder = Recorder::default();
        queue.drain_into(&mut recorder);
        assert_eq!(
            recorder.0,
            vec![
                AudioCommand::PlayLoop(SoundCue::Music),
                AudioCommand::PlayOnce(SoundCue::Jump),
                AudioCommand::Stop(SoundCue::Music),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_is_capped_per_step() {
        let mut queue = AudioQueue::new();
        for _ in 0..(MAX_COMMANDS_PER_STEP + 10) {
            queue.play_once(SoundCue::Coin);
        }
        assert_eq!(queue.pending().len(), MAX_COMMANDS_PER_STEP);
    }

    #[test]
    fn queue_forwards_into_queue() {
        let mut inner = AudioQueue::new();
        inner.play_once(SoundCue::Hurt);
        let mut outer = AudioQueue::new();
        outer.play_loop(SoundCue::Music);
        inner.drain_into(&mut outer);
        assert!(inner.is_empty());
        assert_eq!(
            outer.pending(),
            &[
                AudioCommand::PlayLoop(SoundCue::Music),
                AudioCommand::PlayOnce(SoundCue::Hurt)
            ]
        );
    }

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ma_audio_test_{}_{}_{}.wav",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    /// 16-bit mono PCM at 22050 Hz.
    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&22050u32.to_le_bytes());
        out.extend_from_slice(&44100u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    #[test]
    fn clip_decodes_from_wav_file() {
        let path = temp_file_path("decode");
        let samples: Vec<i16> = (0..2205).map(|i| ((i % 50) * 400 - 10_000) as i16).collect();
        std::fs::write(&path, wav_bytes(&samples)).expect("write wav file");
        let clip = load_clip(&path).expect("clip should decode");
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.sample_rate(), 22050);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_clip_is_an_error_not_a_panic() {
        let err = load_clip(Path::new("definitely/not/here.wav")).err().expect("missing file");
        assert!(err.contains("Failed to open sound"));
    }

    #[test]
    fn cue_paths_point_at_wav_files() {
        for cue in SoundCue::ALL {
            assert!(cue.asset_path().starts_with("sounds/"));
            assert!(cue.asset_path().ends_with(".wav"));
        }
        assert_eq!(SoundCue::Music.asset_path(), "sounds/menu.wav");
    }

    #[test]
    fn shipped_assets_cover_every_cue() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        for cue in SoundCue::ALL {
            let clip = load_clip(&root.join(cue.asset_path()))
                .unwrap_or_else(|err| panic!("{err}"));
            assert!(clip.sample_rate() > 0);
        }
    }

    #[test]
    fn log_backend_tracks_loops() {
        let mut backend = LogAudioBackend::default();
        backend.execute(AudioCommand::PlayLoop(SoundCue::Music));
        backend.execute(AudioCommand::PlayLoop(SoundCue::Music));
        assert!(backend.is_looping(SoundCue::Music));
        backend.execute(AudioCommand::Stop(SoundCue::Music));
        assert!(!backend.is_looping(SoundCue::Music));
    }
}
