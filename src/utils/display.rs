//! Display and output formatting utilities

use crate::simulation::RunSummary;
use crate::triangle_life::{AnimationMatcher, Field, Orientation};
use itertools::Itertools;

/// Text rendering of fields and run results
pub struct FieldFormatter;

impl FieldFormatter {
    /// One line per row; live cells show their orientation
    pub fn format_field_compact(field: &Field) -> String {
        let mut output = String::with_capacity(field.height() * (field.width() * 3 + 1));
        for j in 0..field.height() {
            for i in 0..field.width() {
                output.push(Self::cell_symbol(field, i, j));
            }
            output.push('\n');
        }
        output
    }

    /// Like [`FieldFormatter::format_field_compact`] with column and row numbers
    pub fn format_field_with_coords(field: &Field) -> String {
        let mut output = String::new();

        output.push_str("   ");
        output.push_str(&(0..field.width()).map(|i| i % 10).join(""));
        output.push('\n');

        for j in 0..field.height() {
            output.push_str(&format!("{:2} ", j));
            for i in 0..field.width() {
                output.push(Self::cell_symbol(field, i, j));
            }
            output.push('\n');
        }

        output
    }

    fn cell_symbol(field: &Field, i: usize, j: usize) -> char {
        if !field.get(i as isize, j as isize) {
            return '·';
        }
        match Orientation::of(i, j) {
            Orientation::Up => '▲',
            Orientation::Down => '▼',
        }
    }

    /// List the transitions the matcher prepared
    pub fn format_transitions(matcher: &AnimationMatcher) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Transitions: {} rotation(s), {} fade-in(s), {} fade-out(s)\n",
            matcher.rotations().len(),
            matcher.fade_ins().len(),
            matcher.fade_outs().len()
        ));

        if !matcher.rotations().is_empty() {
            output.push_str("Column | Row  | Pivot | Turns\n");
            output.push_str("-------|------|-------|------\n");
            for rotation in matcher.rotations().iter().take(10) {
                output.push_str(&format!(
                    "{:6} | {:4} | {:5} | {:+}\n",
                    rotation.column, rotation.row, rotation.pivot, rotation.turns
                ));
            }
            if matcher.rotations().len() > 10 {
                output.push_str(&format!("... and {} more\n", matcher.rotations().len() - 10));
            }
        }

        output
    }

    /// Human readable run summary
    pub fn format_summary(summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("=== Run Summary ===\n");
        output.push_str(&format!("Field: {}x{}\n", summary.width, summary.height));
        output.push_str(&format!("Algorithm: {}\n", summary.algorithm));
        if let Some(seed) = summary.seed {
            output.push_str(&format!("Seed: {}\n", seed));
        }
        output.push_str(&format!("Generations: {}\n", summary.generations));
        output.push_str(&format!(
            "Population: {} → {} (min {}, max {})\n",
            summary.initial_population,
            summary.final_population,
            summary.min_population,
            summary.max_population
        ));
        let cells = (summary.width * summary.height) as f64;
        output.push_str(&format!(
            "Density: {:.1}%\n",
            summary.final_population as f64 / cells * 100.0
        ));
        output.push_str(&format!("Run Time: {}ms\n", summary.elapsed_ms));

        output
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Check if terminal supports color
    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() &&
        (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::TransitionCounts;
    use crate::triangle_life::{BitGrid, Buffer, StepAlgorithm};

    #[test]
    fn test_field_formatting() {
        let mut field = Field::empty(4, 2).unwrap();
        field.set_checked(0, 0);
        field.set_checked(1, 0);
        field.set_checked(3, 1);

        let compact = FieldFormatter::format_field_compact(&field);
        assert_eq!(compact, "▲▼··\n···▲\n");

        let with_coords = FieldFormatter::format_field_with_coords(&field);
        assert!(with_coords.starts_with("   0123\n"));
        assert!(with_coords.contains(" 1 ···▲"));
    }

    #[test]
    fn test_transition_formatting() {
        let mut grid = BitGrid::new(6, 6).unwrap();
        grid.set_unchecked(Buffer::Back, 2, 3);
        grid.set_unchecked(Buffer::Active, 2, 2);
        let mut matcher = AnimationMatcher::new();
        matcher.match_buffers(&grid, Buffer::Back, Buffer::Active);

        let text = FieldFormatter::format_transitions(&matcher);
        assert!(text.contains("1 rotation(s), 0 fade-in(s), 0 fade-out(s)"));
        assert!(text.contains("     2 |    3 |     0 | -1"));
    }

    #[test]
    fn test_summary_formatting() {
        let summary = RunSummary {
            width: 10,
            height: 10,
            algorithm: StepAlgorithm::Table,
            seed: Some(4),
            generations: 5,
            initial_population: 50,
            final_population: 25,
            min_population: 20,
            max_population: 50,
            last_transitions: TransitionCounts::default(),
            elapsed_ms: 1,
        };
        let text = FieldFormatter::format_summary(&summary);
        assert!(text.contains("Algorithm: table"));
        assert!(text.contains("Seed: 4"));
        assert!(text.contains("Density: 25.0%"));
    }

    #[test]
    fn test_color_output() {
        let colored = ColorOutput::colored("test", Color::Red);
        assert!(colored.contains("test"));

        let success = ColorOutput::success("OK");
        assert!(success.contains("OK"));
    }
}
