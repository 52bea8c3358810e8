//! Speech engines backed by local processes
//!
//! Synthesis pipes text to `espeak-ng` or macOS `say`; recognition runs a
//! configured command and reads the transcript from its stdout. Every child
//! gets its own process group so cancellation can take down the whole tree.

use super::{SpeechRecognizer, SpeechSynthesizer, VoiceDescriptor, VoiceError};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

const VOICE_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Kill a process group immediately with SIGKILL.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let pgid = Pid::from_raw(pid.cast_signed());
    tracing::debug!(pgid = pid, "Sending SIGKILL to process group");
    let _ = killpg(pgid, Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn isolated(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(true)
}

/// Text-to-speech programs we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEngine {
    EspeakNg,
    Say,
}

impl SpeechEngine {
    pub fn program(self) -> &'static str {
        match self {
            SpeechEngine::EspeakNg => "espeak-ng",
            SpeechEngine::Say => "say",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "espeak-ng" | "espeak" => Some(SpeechEngine::EspeakNg),
            "say" => Some(SpeechEngine::Say),
            _ => None,
        }
    }

    /// First known engine found on `PATH`
    pub fn detect() -> Option<Self> {
        [SpeechEngine::EspeakNg, SpeechEngine::Say]
            .into_iter()
            .find(|engine| which::which(engine.program()).is_ok())
    }

    fn list_voices_args(self) -> &'static [&'static str] {
        match self {
            SpeechEngine::EspeakNg => &["--voices"],
            SpeechEngine::Say => &["-v", "?"],
        }
    }

    fn speak_args(self, voice: Option<&VoiceDescriptor>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.id.clone());
        }
        match self {
            SpeechEngine::EspeakNg => args.push("--stdin".to_string()),
            SpeechEngine::Say => args.extend(["-f".to_string(), "-".to_string()]),
        }
        args
    }

    fn parse_voices(self, listing: &str) -> Vec<VoiceDescriptor> {
        match self {
            SpeechEngine::EspeakNg => parse_espeak_voices(listing),
            SpeechEngine::Say => parse_say_voices(listing),
        }
    }
}

/// `espeak-ng --voices` prints a header row, then
/// `Pty Language Age/Gender VoiceName File Other`.
fn parse_espeak_voices(listing: &str) -> Vec<VoiceDescriptor> {
    listing
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let pty = cols.next()?;
            if pty.eq_ignore_ascii_case("pty") {
                return None;
            }
            let language = cols.next()?;
            let _age_gender = cols.next()?;
            let name = cols.next()?;
            Some(VoiceDescriptor {
                id: language.to_string(),
                name: name.replace('_', " "),
                locale: language.to_string(),
            })
        })
        .collect()
}

/// `say -v ?` prints `Name   locale   # sample sentence`; names may contain
/// spaces.
fn parse_say_voices(listing: &str) -> Vec<VoiceDescriptor> {
    listing
        .lines()
        .filter_map(|line| {
            let described = line.split_once('#').map_or(line, |(left, _)| left);
            let (name, locale) = described.trim().rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(VoiceDescriptor {
                id: name.to_string(),
                name: name.to_string(),
                locale: locale.to_string(),
            })
        })
        .collect()
}

/// Synthesizer that runs one engine process per utterance
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    engine: SpeechEngine,
    program: String,
}

impl CommandSynthesizer {
    pub fn new(engine: SpeechEngine) -> Self {
        Self::with_program(engine, engine.program())
    }

    /// Drive `program` with `engine`'s arguments and voice listing format
    pub fn with_program(engine: SpeechEngine, program: impl Into<String>) -> Self {
        Self {
            engine,
            program: program.into(),
        }
    }
}

/// Write the whole text to the engine, close stdin, and wait for it to exit.
async fn feed_and_wait(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    text: &str,
    program: &str,
) -> Result<ExitStatus, VoiceError> {
    if let Some(mut stdin) = stdin {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| VoiceError::SynthesisFailed(format!("Failed to feed {program}: {e}")))?;
        // EOF starts playback
        drop(stdin);
    }
    child
        .wait()
        .await
        .map_err(|e| VoiceError::SynthesisFailed(format!("Failed to wait for {program}: {e}")))
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn voices(&self) -> Vec<VoiceDescriptor> {
        let program = self.program.as_str();
        let mut cmd = Command::new(program);
        cmd.args(self.engine.list_voices_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        match tokio::time::timeout(VOICE_LIST_TIMEOUT, isolated(&mut cmd).output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let voices = self
                    .engine
                    .parse_voices(&String::from_utf8_lossy(&output.stdout));
                tracing::debug!(program, count = voices.len(), "Loaded voices");
                voices
            }
            Ok(Ok(output)) => {
                tracing::warn!(program, status = %output.status, "Voice listing failed");
                Vec::new()
            }
            Ok(Err(e)) => {
                tracing::warn!(program, error = %e, "Voice listing failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(program, "Voice listing timed out");
                Vec::new()
            }
        }
    }

    async fn speak(
        &self,
        text: &str,
        voice: Option<&VoiceDescriptor>,
        cancel: CancellationToken,
    ) -> Result<(), VoiceError> {
        let program = self.program.as_str();
        let mut cmd = Command::new(program);
        cmd.args(self.engine.speak_args(voice))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = isolated(&mut cmd).spawn().map_err(|e| {
            VoiceError::SynthesisUnavailable(format!("Failed to start {program}: {e}"))
        })?;
        let pid = child.id();
        let stdin = child.stdin.take();

        // Cancellation wins over a stalled stdin write as well as over playback
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = feed_and_wait(&mut child, stdin, text, program) => Some(result),
        };

        match outcome {
            None => {
                kill_process_group(pid);
                let _ = child.start_kill();
                let _ = child.wait().await;
                tracing::debug!(program, "Speech cancelled");
                Ok(())
            }
            Some(Ok(status)) if status.success() => Ok(()),
            Some(Ok(status)) => Err(VoiceError::SynthesisFailed(format!(
                "{program} exited with {status}"
            ))),
            Some(Err(e)) => Err(e),
        }
    }
}

/// Recognizer that runs a configured command per capture.
///
/// `{lang}` in any argument is replaced with the session language; the
/// command's trimmed stdout is the transcript.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a command line with POSIX shell quoting rules.
    ///
    /// `None` if the line is blank or its quotes are unbalanced.
    pub fn from_command_line(line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = shlex::split(line)?.into_iter();
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<String, VoiceError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|arg| arg.replace("{lang}", language)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = isolated(&mut cmd).spawn().map_err(|e| {
            VoiceError::RecognitionFailed(format!("Failed to start {}: {e}", self.program))
        })?;
        let pid = child.id();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => Some(result),
        };

        match outcome {
            None => {
                kill_process_group(pid);
                Err(VoiceError::RecognitionFailed(format!(
                    "{} cancelled",
                    self.program
                )))
            }
            Some(Err(_)) => {
                kill_process_group(pid);
                Err(VoiceError::RecognitionFailed(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )))
            }
            Some(Ok(Err(e))) => Err(VoiceError::RecognitionFailed(format!(
                "Failed to run {}: {e}",
                self.program
            ))),
            Some(Ok(Ok(output))) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(VoiceError::RecognitionFailed(format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )))
            }
            Some(Ok(Ok(output))) => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
        }
    }
}
