use reason_memory_core::error::Result;
use reason_memory_core::tools::types::{ManageWorkspaceInput, ManageWorkspaceOutput, WorkspaceAction};

use crate::cli::{Commands, WorkspaceCommands};
use crate::output::Output;

use super::Context;

impl Output for ManageWorkspaceOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        match (&self.id, &self.name, &self.path) {
            (Some(id), Some(name), Some(path)) => {
                writeln!(writer, "{name} ({id}) at {}", path.display())?;
            }
            _ => writeln!(writer, "no workspace is currently set")?,
        }
        Ok(())
    }
}

pub fn run_workspace(ctx: &Context, command: &Commands) -> Result<ManageWorkspaceOutput> {
    let Commands::Workspace { action } = command else {
        unreachable!("run_workspace dispatched with a non-Workspace command")
    };
    let input = match action {
        WorkspaceCommands::Set { path } => ManageWorkspaceInput {
            action: WorkspaceAction::Set,
            path: Some(path.clone()),
        },
        WorkspaceCommands::Get => ManageWorkspaceInput {
            action: WorkspaceAction::Get,
            path: None,
        },
        WorkspaceCommands::Clear => ManageWorkspaceInput {
            action: WorkspaceAction::Clear,
            path: None,
        },
    };
    ctx.host.manage_workspace(input)
}
