use std::process::Command;

use log::info;

use crate::error::{Result, UpdateError};
use crate::options::PostExec;

/// Start the successor executable from its own directory and return its pid.
///
/// The child is detached in the sense that nobody waits on it; its exit
/// status is never inspected.
pub fn launch_successor(post_exec: &PostExec) -> Result<u32> {
    let has_dir = post_exec
        .program
        .parent()
        .is_some_and(|dir| !dir.as_os_str().is_empty());
    if !has_dir {
        return Err(UpdateError::MissingWorkingDirectory(post_exec.program.clone()));
    }

    let args = shell_words::split(&post_exec.args).map_err(|source| {
        UpdateError::InvalidArguments {
            args: post_exec.args.clone(),
            source,
        }
    })?;

    // Relative programs would otherwise be resolved after the chdir.
    let program =
        std::path::absolute(&post_exec.program).map_err(UpdateError::io(&post_exec.program))?;
    let working_dir = program
        .parent()
        .ok_or_else(|| UpdateError::MissingWorkingDirectory(post_exec.program.clone()))?;

    info!("Restarting application: {} {:?}", program.display(), args);
    let child = Command::new(&program)
        .args(&args)
        .current_dir(working_dir)
        .spawn()
        .map_err(|source| UpdateError::Spawn {
            program: program.clone(),
            source,
        })?;

    Ok(child.id())
}
