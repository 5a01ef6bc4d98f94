//! Registry listing.

use crate::config::ConfigContext;
use crate::registry::TargetRegistry;
use crate::ui;
use colored::*;

pub fn list_targets(ctx: &ConfigContext, registry: &TargetRegistry) {
    match ctx.config_path() {
        _ if ctx.no_config() => println!("config: disabled (legacy mode)"),
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: none"),
    }

    let mut table = ui::Table::new(&["Target", "Id", "Src", "Core", "Enabled"]);
    for t in registry.iter() {
        let use_core = ctx
            .resolve_override(&t.name)
            .is_some_and(|ov| ov.use_core);
        let enabled = if t.enabled {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec![
            t.name.bold().to_string(),
            t.id.clone(),
            t.src_dir.display().to_string(),
            if use_core { "yes" } else { "no" }.to_string(),
            enabled,
        ]);
    }
    table.print();
}
