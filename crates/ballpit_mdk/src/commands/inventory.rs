use ballpit_assets::ResourceKind;
use ballpit_utils::{ok, AnyResult};
use clap::Args;
use itertools::Itertools;
use std::path::PathBuf;

#[derive(Args)]
pub struct InventoryCommand {
    /// Game directory to scan
    pub root: PathBuf,
    /// Asset configuration file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Only list resources of this kind
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<ResourceKind>,
}

impl crate::Command for InventoryCommand {
    fn run(self) -> AnyResult {
        let cache = crate::open_cache(&self.root, self.config.as_deref())?;

        let identifiers = cache
            .identifiers()
            .into_iter()
            .filter(|(_, kind)| self.kind.map(|wanted| wanted == *kind).unwrap_or(true))
            .collect_vec();

        for (id, kind) in &identifiers {
            println!("{kind:<8} {id}");
        }

        let counts = identifiers
            .iter()
            .counts_by(|(_, kind)| *kind)
            .into_iter()
            .sorted_by_key(|(kind, _)| kind.to_string())
            .map(|(kind, count)| format!("{count} {kind}(s)"))
            .join(", ");
        println!(" : {} resources ({counts})", identifiers.len());

        ok()
    }
}

fn parse_kind(text: &str) -> Result<ResourceKind, String> {
    match text {
        "sprite" => Ok(ResourceKind::Sprite),
        "template" => Ok(ResourceKind::Template),
        "item" => Ok(ResourceKind::Item),
        other => Err(format!("unknown resource kind `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse() {
        assert_eq!(parse_kind("sprite"), Ok(ResourceKind::Sprite));
        assert_eq!(parse_kind("item"), Ok(ResourceKind::Item));
        assert!(parse_kind("sound").is_err());
    }
}
