//! Handles all user-facing output for the CLI.
//!
//! Colorized trace diffs, token listings and macro listings. Output goes
//! through `termcolor` so colors are dropped when stdout is not a terminal.

use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::codegen::{self, PrintOptions};
use crate::compiler::ExpansionStep;
use crate::macros::{MacroDeclaration, MacroPatternArgument};
use crate::syntax::Token;
use crate::MacroJsError;

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints an expansion trace with colored diffs.
///
/// Each step is printed as its expanded code; from the second step on, the
/// code is diffed line by line against the previous step.
pub fn print_trace(trace: &[ExpansionStep]) -> Result<(), MacroJsError> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut last_code = String::new();

    for (i, step) in trace.iter().enumerate() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let color = step.color.map(|c| format!(" [color {c}]")).unwrap_or_default();
        println!(
            "--- Step {}: {}({}) at {}{} ---",
            i, step.macro_name, step.input, step.span, color
        );
        let _ = stdout.reset();

        let code = match &step.expansion {
            Some(program) => codegen::print(program, &PrintOptions::default())?.code,
            None => String::new(),
        };
        if i == 0 {
            print!("{code}");
        } else {
            let changeset = Changeset::new(&last_code, &code, "\n");
            print_diff(&mut stdout, &changeset.diffs);
        }
        last_code = code;
        println!();
    }
    Ok(())
}

/// Prints one token per line: position, kind and text.
pub fn print_tokens(tokens: &[Token]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for token in tokens {
        let _ = stdout.set_color(ColorSpec::new().set_dimmed(true));
        let _ = write!(stdout, "{:>8}  ", token.span.to_string());
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(stdout, "{:<8}", token.kind.as_str());
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{token}");
    }
}

/// Prints each macro with its pattern alternatives.
pub fn print_macros<'a>(macros: impl IntoIterator<Item = &'a MacroDeclaration>) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for declaration in macros {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = write!(stdout, "{}", declaration.name);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " ({})", declaration.span);
        for pattern in &declaration.patterns {
            let _ = writeln!(stdout, "    ({})", render_pattern(&pattern.arguments));
        }
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn render_pattern(arguments: &[MacroPatternArgument]) -> String {
    arguments
        .iter()
        .map(|argument| match argument {
            MacroPatternArgument::Literal(token) => token.value.clone(),
            MacroPatternArgument::Variable { name, kind, .. } => format!("${name}:{}", kind.as_str()),
            MacroPatternArgument::Repetition { content, separator, .. } => {
                format!("$({}){}", render_pattern(content), separator.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                println!(" {}", x);
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                println!("+{}", x);
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                println!("-{}", x);
            }
        }
    }
    let _ = stdout.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Session;
    use crate::macros::MacroParser;
    use crate::syntax::{render_tokens, tokenize};

    #[test]
    fn patterns_render_like_their_source() {
        let mut session = Session::new();
        let tokens = tokenize("macro add { ($a:literal, $($rest:expr),) => { 0 } }").unwrap();
        MacroParser::new(&mut session, tokens).parse_program().unwrap();
        let (_, declaration) = session.macros.iter().next().unwrap();
        assert_eq!(
            render_pattern(&declaration.patterns[0].arguments),
            "$a:literal , $($rest:expr),"
        );
        assert_eq!(render_tokens(&declaration.patterns[0].body), "0");
    }
}
