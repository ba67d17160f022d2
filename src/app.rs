use crate::config::{Config, EffectKind};
use crate::stage::Stage;
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType},
};
use std::io::{stdout, BufWriter};
use std::time::{Duration, Instant};

const FIXED_DT: f32 = 1.0 / 60.0;

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('q')
        || key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

pub fn run(cfg: &Config) -> anyhow::Result<()> {
    let _guard = TerminalGuard::new()?;
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout());

    let (cols, rows) = terminal::size().context("query terminal size")?;
    let mut stage = Stage::new(cols, rows, cfg.scale, cfg.panel, cfg.bg_color());
    for kind in &cfg.layers {
        stage.mount(*kind);
    }
    tracing::info!(cols, rows, layers = ?stage.layer_names(), "stage ready");

    let handle = stage.start();
    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    while handle.is_running() {
        if event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            match &event {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if is_quit(key) {
                        handle.stop();
                        continue;
                    }
                    if let KeyCode::Char(c) = key.code {
                        if let Some(kind) = EffectKind::from_key(c) {
                            stage.toggle(kind);
                        }
                    }
                }
                Event::Resize(..) => {
                    stage.dispatch(&event);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => stage.dispatch(&event),
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            stage.update(FIXED_DT);
            accumulator -= FIXED_DT;
        }

        stage.render(&mut stdout)?;
    }

    tracing::info!("stage stopped");
    Ok(())
}
