use std::io::{self, Write};

use quiz_core::model::{ExamResult, Identity, UserRole};
use services::{ProfileError, ProfileService};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ResultsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Print the profile of `identity`: own results for students, an overview of
/// every student for professors.
///
/// # Errors
///
/// Returns `ResultsError` when the profile cannot be loaded or written.
pub(crate) async fn print_results<W: Write>(
    profiles: &ProfileService,
    identity: &Identity,
    limit: u32,
    out: &mut W,
) -> Result<(), ResultsError> {
    let view = profiles.profile(identity).await?;
    writeln!(
        out,
        "{} ({}), member since {}",
        view.profile.name,
        view.profile.role,
        view.profile.created_at.format("%Y-%m-%d")
    )?;

    match view.profile.role {
        UserRole::Student => {
            let results = profiles.student_results(identity, limit).await?;
            if results.is_empty() {
                writeln!(out, "No exam results yet.")?;
            }
            for result in &results {
                print_result_line(result, out)?;
            }
        }
        UserRole::Professor => {
            let overview = profiles.students_overview(identity, limit).await?;
            if overview.is_empty() {
                writeln!(out, "No students registered.")?;
            }
            for student in &overview {
                writeln!(out)?;
                writeln!(
                    out,
                    "{} (id {}): {} results",
                    student.profile.name,
                    student.profile.user_id,
                    student.results.len()
                )?;
                for result in &student.results {
                    print_result_line(result, out)?;
                }
            }
        }
    }
    Ok(())
}

fn print_result_line<W: Write>(result: &ExamResult, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "  {}  {:<28} {}/{}",
        result.created_at().format("%Y-%m-%d %H:%M"),
        result.exam_title(),
        result.score(),
        result.max_score()
    )
}
