//! One-line text rendering of the session state.

use super::Presenter;
use crate::session::{Outcome, Phase, RenderState};
use std::io::Write;

/// Formats the status line for a render state.
pub fn status_line(render: &RenderState) -> String {
    match render.phase {
        Phase::Idle => "Position your face in the frame".to_string(),
        Phase::Tracking => {
            let label = render
                .label
                .map(|l| l.as_str().to_ascii_uppercase())
                .unwrap_or_default();
            let elapsed = render.elapsed_secs.unwrap_or(0.0);
            let mut line = format!(
                "{} {}s / {}s [{:>3.0}%]",
                label,
                elapsed.floor(),
                render.threshold_secs,
                render.progress() * 100.0
            );
            if render.face_missing {
                line.push_str(" - No face detected! Please position your face.");
            }
            line
        }
        Phase::Verified => match render.outcome {
            Some(Outcome::Success) => "VERIFICATION SUCCESSFUL".to_string(),
            Some(Outcome::Failed) => "VERIFICATION FAILED".to_string(),
            None => "VERIFIED".to_string(),
        },
        Phase::Resetting => {
            let remaining = render.remaining_countdown.unwrap_or(0.0);
            format!("Starting new scan in: {}s", remaining.ceil())
        }
    }
}

/// Writes a status line whenever it changes, or every `every` ticks.
pub struct TextPresenter<W: Write> {
    out: W,
    every: u32,
    ticks: u64,
    last_line: Option<String>,
}

impl<W: Write> TextPresenter<W> {
    /// `every = 0` writes only when the line changes.
    pub fn new(out: W, every: u32) -> Self {
        Self {
            out,
            every,
            ticks: 0,
            last_line: None,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextPresenter<std::io::Stdout> {
    /// Presenter writing to standard output.
    pub fn stdout(every: u32) -> Self {
        Self::new(std::io::stdout(), every)
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn present(&mut self, render: &RenderState) {
        self.ticks += 1;
        let line = status_line(render);
        let periodic = self.every > 0 && self.ticks % u64::from(self.every) == 0;

        if periodic || self.last_line.as_deref() != Some(line.as_str()) {
            if let Err(e) = writeln!(self.out, "{line}") {
                tracing::warn!(error = %e, "Failed to write status line");
            }
            self.last_line = Some(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::detection::{DetectionSample, Label};
    use crate::session::VerificationSession;

    #[test]
    fn test_status_lines_follow_phases() {
        let mut session = VerificationSession::default();
        let at = Timestamp::from_secs_f64;

        let idle = session.tick(None, at(0.0));
        assert_eq!(status_line(&idle), "Position your face in the frame");

        let tracking = session.tick(Some(DetectionSample::new(Label::Real, 0.9, at(1.0))), at(1.0));
        assert!(status_line(&tracking).starts_with("REAL 0s / 10s"));

        let gap = session.tick(None, at(2.5));
        assert!(status_line(&gap).contains("No face detected"));

        session.request_reset();
        assert_eq!(status_line(&session.render()), "Starting new scan in: 3s");
    }

    #[test]
    fn test_writes_only_on_change() {
        let session = VerificationSession::default();
        let mut presenter = TextPresenter::new(Vec::new(), 0);

        presenter.present(&session.render());
        presenter.present(&session.render());

        let written = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(written.lines().count(), 1);
    }

    #[test]
    fn test_periodic_writes() {
        let session = VerificationSession::default();
        let mut presenter = TextPresenter::new(Vec::new(), 2);

        for _ in 0..4 {
            presenter.present(&session.render());
        }

        let written = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(written.lines().count(), 3);
    }
}
