use std::io::{self, Write};

use workbench_core::{Indicator, LoadPhase, ViewModel};

use crate::session::Session;
use crate::shape::{Color, Structure};

pub fn render(
    out: &mut impl Write,
    session: &Session,
    view: &ViewModel,
    structure: Option<&Structure>,
) -> io::Result<()> {
    writeln!(out, "=== {} ===", session.title())?;

    let marker = match view.indicator {
        Indicator::Normal => "  ",
        Indicator::Error => "!!",
    };
    writeln!(out, "{marker}[{}]", view.input_text)?;

    let status = match view.phase {
        LoadPhase::Idle => "idle",
        LoadPhase::Loading => "loading",
        LoadPhase::Ready => "ready",
        LoadPhase::Error => "error",
    };
    if view.in_flight > 0 {
        writeln!(out, "status: {status} ({} loading)", view.in_flight)?;
    } else {
        writeln!(out, "status: {status}")?;
    }

    match structure {
        None => writeln!(out, "(empty)")?,
        Some(structure) => {
            if let Some(background) = structure.background {
                writeln!(out, "background: {}", color(background))?;
            }
            let counts = structure
                .counts()
                .into_iter()
                .map(|(kind, count)| format!("{kind} {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "shapes: {} ({counts})", structure.shapes.len())?;
            for shape in structure.shapes.iter().filter(|s| s.comment.is_some()) {
                if let Some(comment) = &shape.comment {
                    writeln!(out, "  {} {}: {comment}", shape.kind.name(), color(shape.color))?;
                }
            }
        }
    }
    Ok(())
}

pub fn render_history(out: &mut impl Write, session: &Session) -> io::Result<()> {
    if session.history().is_empty() {
        return writeln!(out, "(no history)");
    }
    for (i, entry) in session.history().iter().enumerate() {
        writeln!(out, "{:>2}. {}  {}", i + 1, entry.loaded_utc, entry.resource)?;
    }
    Ok(())
}

pub fn render_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  open <path>      load a shape file from disk")?;
    writeln!(out, "  load <url|path>  load a resource (or just type it)")?;
    writeln!(out, "  refresh          reload the current resource")?;
    writeln!(out, "  clear            clear the viewer")?;
    writeln!(out, "  history          list recently shown resources")?;
    writeln!(out, "  quit")
}

fn color(color: Color) -> String {
    format!("rgba({}, {}, {}, {})", color.r, color.g, color.b, color.a)
}
