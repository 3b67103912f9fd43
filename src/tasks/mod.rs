// src/tasks/mod.rs

//! Built-in tasks.
//!
//! - [`files`]: copy, rename, remove and find-and-replace over files.
//! - [`config_tasks`]: tasks that derive values and write them back into the
//!   config tree.
//! - [`hooks`]: user hook scripts.
//! - [`android`]: the device bridge and the `run_android` task.

pub mod android;
pub mod config_tasks;
pub mod files;
pub mod hooks;

use crate::errors::Result;
use crate::pipeline::{FnTask, TaskRegistry};

/// Register every built-in task.
pub fn register_builtin(tasks: &mut TaskRegistry) -> Result<()> {
    tasks.register(
        "copy_files",
        FnTask::new(files::copy_files).checked(files::check_from_to),
    )?;
    tasks.register(
        "rename_files",
        FnTask::new(files::rename_files).checked(files::check_from_to),
    )?;
    tasks.register_fn("remove_files", files::remove_files)?;
    tasks.register(
        "find_and_replace",
        FnTask::new(files::find_and_replace).checked(files::check_find_replace),
    )?;
    tasks.register(
        "find_and_replace_in_dir",
        FnTask::new(files::find_and_replace_in_dir).checked(files::check_find_replace_in_dir),
    )?;

    tasks.register(
        "resolve_urls",
        FnTask::new(config_tasks::resolve_urls).checked(config_tasks::check_resolve_urls),
    )?;
    tasks.register(
        "populate_icons",
        FnTask::new(config_tasks::populate_icons).checked(config_tasks::check_populate_icons),
    )?;
    tasks.register_fn("populate_xml_safe_name", config_tasks::populate_xml_safe_name)?;
    tasks.register_fn("populate_json_safe_name", config_tasks::populate_json_safe_name)?;
    tasks.register_fn("populate_package_names", config_tasks::populate_package_names)?;

    tasks.register("run_hook", hooks::RunHook)?;
    tasks.register("run_android", android::RunAndroid)?;
    Ok(())
}
