//! Navigator that renders the two wizard screens as plain text.
use std::time::Duration;

use async_trait::async_trait;

use wizard_core::{OpponentType, SessionSnapshot};
use wizard_runtime::{NavigationContext, NavigationError, NavigationResult, Navigator};

/// Prints each screen to stdout after an optional simulated delay.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNavigator {
    delay: Duration,
}

impl ConsoleNavigator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn settle(&self, ctx: &NavigationContext) -> NavigationResult {
        if self.delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = ctx.cancellation().cancelled() => Err(NavigationError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

#[async_trait]
impl Navigator for ConsoleNavigator {
    async fn open_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult {
        self.settle(ctx).await?;
        let snapshot = ctx.session().snapshot();
        println!();
        println!("== Mode selection ==");
        println!("  mode: {}", display_or(&snapshot.mode_id, "<none>"));
        println!("  commands: mode classic [secs], continue, cancel");
        Ok(())
    }

    async fn close_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult {
        self.settle(ctx).await
    }

    async fn open_match_setup(&self, ctx: &NavigationContext) -> NavigationResult {
        self.settle(ctx).await?;
        let snapshot = ctx.session().snapshot();
        println!();
        println!("== Match setup ==");
        println!("  opponent: {}", describe_opponent(&snapshot));
        println!(
            "  commands: bot <difficulty>, human local|invite|matchmaking, target <player>, launch, back, cancel"
        );
        Ok(())
    }

    async fn close_match_setup(&self, ctx: &NavigationContext) -> NavigationResult {
        self.settle(ctx).await
    }

    async fn close_all_wizard_windows(&self, ctx: &NavigationContext) -> NavigationResult {
        self.settle(ctx).await?;
        println!("== Wizard closed ==");
        Ok(())
    }
}

pub(crate) fn describe_opponent(snapshot: &SessionSnapshot) -> String {
    match snapshot.opponent_type {
        OpponentType::Bot => format!(
            "bot ({})",
            snapshot.bot_difficulty_id.as_deref().unwrap_or("no difficulty")
        ),
        OpponentType::Human => match &snapshot.target_player_id {
            Some(target) => format!("human {} -> {target}", snapshot.human_kind),
            None => format!("human {}", snapshot.human_kind),
        },
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
