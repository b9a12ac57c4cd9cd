use crate::context::Context;
use crate::output::{print_json, print_table};
use captain_core::catalog::ActionCatalog;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let catalog = ActionCatalog::standard();

    if ctx.json {
        return print_json(&catalog.specs());
    }

    let rows: Vec<Vec<String>> = catalog
        .specs()
        .iter()
        .map(|spec| {
            let params = if spec.args.is_empty() {
                "-".to_string()
            } else {
                spec.args
                    .iter()
                    .map(|a| a.id)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            vec![
                spec.kind.to_string(),
                spec.title.to_string(),
                spec.color.to_string(),
                params,
            ]
        })
        .collect();
    print_table(&["KIND", "TITLE", "COLOR", "PARAMS"], &rows);
    Ok(())
}
