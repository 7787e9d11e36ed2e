use clap::Args;

use macroplan::db::LocalStore;
use macroplan::models::{MacroGroup, UiPrefs};
use macroplan::planner::PlanError;
use macroplan::sync::{RemoteStore, SyncEngine};

use super::parse_group;

/// Show or change preferences stored with the plan
#[derive(Args)]
pub struct PrefsCommand {
    #[arg(long)]
    hints: Option<bool>,

    /// Snap hand-entered grams to 5 g
    #[arg(long)]
    snap: Option<bool>,

    /// Carbs column in the printable plan
    #[arg(long)]
    show_carbs: Option<bool>,

    #[arg(long)]
    show_protein: Option<bool>,

    #[arg(long)]
    show_fat: Option<bool>,

    /// Meal targets in the printable plan
    #[arg(long)]
    show_targets: Option<bool>,

    /// Collapse a food group in listings (c, p or f)
    #[arg(long, value_parser = parse_group)]
    collapse: Vec<MacroGroup>,

    /// Expand a food group in listings
    #[arg(long, value_parser = parse_group)]
    expand: Vec<MacroGroup>,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn print_prefs(ui: &UiPrefs) {
    println!("Hints:            {}", yes_no(ui.show_hints));
    println!("Snap to 5 g:      {}", yes_no(ui.snap_manual));
    println!(
        "Collapsed groups: {}",
        [
            (ui.foods_collapsed.c, "carbs"),
            (ui.foods_collapsed.p, "protein"),
            (ui.foods_collapsed.f, "fat"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
    );
    println!("Plan columns:");
    println!("  carbs:   {}", yes_no(ui.preview.show_carbs));
    println!("  protein: {}", yes_no(ui.preview.show_protein));
    println!("  fat:     {}", yes_no(ui.preview.show_fat));
    println!("  targets: {}", yes_no(ui.preview.show_targets));
}

impl PrefsCommand {
    fn has_updates(&self) -> bool {
        self.hints.is_some()
            || self.snap.is_some()
            || self.show_carbs.is_some()
            || self.show_protein.is_some()
            || self.show_fat.is_some()
            || self.show_targets.is_some()
            || !self.collapse.is_empty()
            || !self.expand.is_empty()
    }

    fn apply(&self, ui: &mut UiPrefs) {
        let set = |target: &mut bool, value: Option<bool>| {
            if let Some(value) = value {
                *target = value;
            }
        };
        set(&mut ui.show_hints, self.hints);
        set(&mut ui.snap_manual, self.snap);
        set(&mut ui.preview.show_carbs, self.show_carbs);
        set(&mut ui.preview.show_protein, self.show_protein);
        set(&mut ui.preview.show_fat, self.show_fat);
        set(&mut ui.preview.show_targets, self.show_targets);

        let flags = &mut ui.foods_collapsed;
        for (groups, value) in [(&self.collapse, true), (&self.expand, false)] {
            for group in groups {
                match group {
                    MacroGroup::Carbs => flags.c = value,
                    MacroGroup::Protein => flags.p = value,
                    MacroGroup::Fat => flags.f = value,
                }
            }
        }
    }

    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.has_updates() {
            engine
                .mutate(|doc| {
                    self.apply(&mut doc.ui);
                    Ok::<_, PlanError>(())
                })
                .await?;
        }
        let ui = engine.read(|doc| doc.ui).await;
        print_prefs(&ui);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        prefs: PrefsCommand,
    }

    #[test]
    fn test_apply_only_touches_given_flags() {
        let harness =
            Harness::try_parse_from(["prefs", "--snap", "true", "--collapse", "p"]).unwrap();
        let mut ui = UiPrefs::default();
        harness.prefs.apply(&mut ui);

        assert!(ui.snap_manual);
        assert!(ui.show_hints);
        assert!(ui.foods_collapsed.p);
        assert!(!ui.foods_collapsed.c);
        assert!(ui.preview.show_targets);
    }

    #[test]
    fn test_no_flags_means_no_update() {
        let harness = Harness::try_parse_from(["prefs"]).unwrap();
        assert!(!harness.prefs.has_updates());
    }
}
