//! ZX Spectrum 48K terminal emulator binary.
//!
//! Two threads cooperate: the CPU thread steps the interpreter and paces
//! itself to 3.5 MHz; the renderer thread redraws the display file at
//! 50 Hz and feeds terminal key events into the keyboard matrix. Both
//! exit when the run control flips to stopped (Esc, Ctrl+C, SIGINT,
//! SIGQUIT, or the instruction limit).

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use spectrum_term::keyboard::KeyLatch;
use spectrum_term::keyboard_map::{self, SYM_SHIFT};
use spectrum_term::renderer::{self, TerminalSession};
use spectrum_term::{RenderMode, RunControl, Shared, Spectrum, disasm, dump, loader, signals};

use sinclair_ula::Frame;

/// Nanoseconds per T-state at 3.5 MHz.
const NS_PER_TSTATE: u64 = 286;

/// 50 Hz frame period.
const FRAME_DURATION: Duration = Duration::from_millis(20);

/// How long a key stays latched after its last terminal event.
const KEY_HOLD: Duration = Duration::from_millis(120);

/// Pace the CPU against the wall clock every this many T-states.
const PACE_INTERVAL: u64 = 10_000;

/// FLASH attribute period in frames (half a cycle).
const FLASH_FRAMES: u64 = 16;

#[derive(Parser)]
#[command(
    name = "spectrum-term",
    about = "ZX Spectrum 48K emulator for the terminal",
    version,
    disable_version_flag = true
)]
struct Cli {
    /// ROM image to load at $0000 (16 KiB max)
    #[arg(short = 'r', long = "rom", value_name = "FILE")]
    rom: Option<PathBuf>,

    /// Disk image (reserved, accepted and ignored)
    #[arg(short = 'd', long = "disk", value_name = "FILE")]
    disk: Option<PathBuf>,

    /// Stop after N instructions (0 = unlimited)
    #[arg(
        short = 'i',
        long = "instructions",
        value_name = "N",
        default_value_t = 0
    )]
    instructions: u64,

    /// Append a one-line disassembly per executed instruction to FILE
    #[arg(short = 'D', long = "disassemble", value_name = "FILE")]
    disassemble: Option<PathBuf>,

    /// TAP tape image, played through the EAR input
    #[arg(long = "tap", value_name = "FILE")]
    tap: Option<PathBuf>,

    /// .z80 snapshot to restore before starting
    #[arg(long = "z80", value_name = "FILE")]
    z80: Option<PathBuf>,

    /// Render with braille cells (2x4 pixels each) instead of quadrants
    #[arg(long = "braille")]
    braille: bool,

    /// Run without the terminal renderer (pair with -i for batch runs)
    #[arg(long = "headless")]
    headless: bool,

    /// Print version information
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("spectrum-term: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let shared = Arc::new(Shared::new());
    let mut machine = Spectrum::new(Arc::clone(&shared));

    if let Some(path) = &cli.rom {
        loader::load_rom(&shared.memory, path)?;
    }
    if let Some(path) = &cli.disk {
        log::warn!("disk images are not supported; ignoring {}", path.display());
    }
    if let Some(path) = &cli.z80 {
        let snapshot = loader::load_snapshot(path)?;
        machine.apply_snapshot(&snapshot);
    }
    if let Some(path) = &cli.tap {
        machine.insert_tape(loader::load_tap(path)?);
    }

    let mut trace = match &cli.disassemble {
        Some(path) => Some(BufWriter::new(
            OpenOptions::new().append(true).create(true).open(path)?,
        )),
        None => None,
    };

    signals::install();
    let run = Arc::new(RunControl::new());

    let renderer = if cli.headless {
        None
    } else {
        let shared = Arc::clone(&shared);
        let run = Arc::clone(&run);
        let mode = if cli.braille {
            RenderMode::Braille
        } else {
            RenderMode::Block
        };
        Some(thread::spawn(move || render_loop(&shared, &run, mode)))
    };

    cpu_loop(&mut machine, &run, cli.instructions, trace.as_mut());

    run.stop();
    if let Some(handle) = renderer {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("renderer failed: {err}"),
            Err(_) => log::warn!("renderer thread panicked"),
        }
    }
    if let Some(writer) = trace.as_mut() {
        writer.flush()?;
    }

    Ok(())
}

/// Step the CPU, pacing to real time and honouring signals, pause, the
/// instruction limit and the trace log.
fn cpu_loop(
    machine: &mut Spectrum,
    run: &RunControl,
    limit: u64,
    mut trace: Option<&mut BufWriter<std::fs::File>>,
) {
    let start = Instant::now();
    let mut next_pace = PACE_INTERVAL;

    while run.wait_while_paused() {
        if signals::stop_requested() {
            break;
        }
        if signals::take_dump_request() {
            match dump::write_memory_dump(&machine.bus.shared.memory) {
                Ok(path) => log::info!("memory dumped to {}", path.display()),
                Err(err) => log::warn!("memory dump failed: {err}"),
            }
        }

        if let Some(writer) = trace.as_deref_mut() {
            let pc = machine.cpu.regs.pc;
            let memory = &machine.bus.shared.memory;
            let line = disasm::disassemble(|addr| memory.read(addr), pc);
            if let Err(err) = writeln!(writer, "{pc:04X}  {:<14} {}", line.bytes, line.mnemonic) {
                log::warn!("trace write failed, disabling trace: {err}");
                trace = None;
            }
        }

        machine.step();

        if limit != 0 && machine.executed() >= limit {
            break;
        }

        // Sleep off any lead over the 3.5 MHz wall-clock schedule.
        if machine.cycles() >= next_pace {
            next_pace = machine.cycles() + PACE_INTERVAL;
            let target = Duration::from_nanos(machine.cycles() * NS_PER_TSTATE);
            let elapsed = start.elapsed();
            if let Some(lead) = target.checked_sub(elapsed)
                && lead > Duration::from_millis(1)
            {
                thread::sleep(lead);
            }
        }
    }

    run.stop();
}

/// Redraw at 50 Hz and pump terminal key events into the matrix.
fn render_loop(shared: &Shared, run: &RunControl, mode: RenderMode) -> std::io::Result<()> {
    let mut term = TerminalSession::enter()?;
    let mut latch = KeyLatch::new(KEY_HOLD);
    let mut frame_count = 0u64;

    while run.is_running() {
        let frame_start = Instant::now();

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()?
                && matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
            {
                match key.code {
                    KeyCode::Esc => run.stop(),
                    KeyCode::F(1) => run.toggle_pause(),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        // Raw mode swallows the terminal's SIGINT.
                        run.stop();
                    }
                    code => {
                        if let Some((main_key, chord)) = keyboard_map::map_keycode(code) {
                            latch.press(&shared.keyboard, main_key.0, main_key.1);
                            if let Some(extra) = chord {
                                latch.press(&shared.keyboard, extra.0, extra.1);
                            }
                            // Host Ctrl doubles as SYMBOL SHIFT.
                            if key.modifiers.contains(KeyModifiers::CONTROL) {
                                latch.press(&shared.keyboard, SYM_SHIFT.0, SYM_SHIFT.1);
                            }
                        }
                    }
                }
            }
        }

        latch.expire(&shared.keyboard);

        let vram = shared.memory.snapshot_vram();
        let frame = Frame::decode(&vram);
        let border = shared.border.load(Ordering::Relaxed);
        let flash_phase = (frame_count / FLASH_FRAMES) % 2 == 1;
        let text = renderer::render_frame(&frame, border, mode, flash_phase);
        term.draw(&text)?;

        frame_count += 1;
        if let Some(rest) = FRAME_DURATION.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    Ok(())
}
