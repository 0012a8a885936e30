use std::io::{self, Write};

use quiz_core::model::Identity;
use services::{PROFILE_RESULT_LIMIT, ProfileError, ProfileService};
use thiserror::Error;

use crate::args::StudentAction;

#[derive(Debug, Error)]
pub(crate) enum StudentsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Apply one account change on behalf of a professor, or list the students.
///
/// # Errors
///
/// Returns `StudentsError` when the change is refused or output fails.
pub(crate) async fn manage_students<W: Write>(
    profiles: &ProfileService,
    identity: &Identity,
    action: &StudentAction,
    out: &mut W,
) -> Result<(), StudentsError> {
    match action {
        StudentAction::List => {
            let overview = profiles
                .students_overview(identity, PROFILE_RESULT_LIMIT)
                .await?;
            if overview.is_empty() {
                writeln!(out, "No students registered.")?;
            }
            for student in &overview {
                writeln!(
                    out,
                    "{:>4}  {:<24} {} results",
                    student.profile.user_id.value(),
                    student.profile.name,
                    student.results.len()
                )?;
            }
        }
        StudentAction::Add { name, role } => {
            let created = profiles.create_account(identity, name, *role).await?;
            writeln!(
                out,
                "Created {} account {} ({}).",
                created.role, created.user_id, created.name
            )?;
        }
        StudentAction::Edit { id, name, role } => {
            let updated = profiles.update_account(identity, *id, name, *role).await?;
            writeln!(
                out,
                "Updated account {}: {} ({}).",
                updated.user_id, updated.name, updated.role
            )?;
        }
        StudentAction::Delete(id) => {
            profiles.delete_account(identity, *id).await?;
            writeln!(out, "Deleted account {id} and its exam results.")?;
        }
    }
    Ok(())
}
