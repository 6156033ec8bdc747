//! Plain text transforms for the `text` namespace, including the terminal
//! renderer that formats the accumulated result for presentation.

use maestro_core::{Capability, DispatchContext, SkillError, SkillSet, RESULT_KEY};
use std::sync::Arc;

const NAMESPACE: &str = "text";
const STYLE_KEY: &str = "style";

/// Skill set for the `text` namespace.
pub struct TextSkills;

impl SkillSet for TextSkills {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        vec![Arc::new(Render), Arc::new(Uppercase)]
    }
}

/// Formats the current primary result (or, when no step has produced one,
/// the original input) into the final presentation string. A plan whose
/// only step is this renderer is treated as empty by plan filtering.
struct Render;

fn render_text(body: &str, style: Option<&str>) -> String {
    let body = body.trim();
    match style {
        Some("bullet") => body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("- {}", line.trim()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => body.to_string(),
    }
}

#[async_trait::async_trait]
impl Capability for Render {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "render"
    }

    fn description(&self) -> &str {
        "Format the accumulated result for presentation to the user"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let body = ctx
            .get(RESULT_KEY)
            .unwrap_or_else(|| ctx.input())
            .to_string();
        let rendered = render_text(&body, ctx.get(STYLE_KEY));
        ctx.set(RESULT_KEY, rendered);
        Ok(())
    }
}

/// Uppercases the current primary result.
struct Uppercase;

#[async_trait::async_trait]
impl Capability for Uppercase {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "uppercase"
    }

    fn description(&self) -> &str {
        "Convert the accumulated result to upper case"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let body = ctx
            .get(RESULT_KEY)
            .unwrap_or_else(|| ctx.input())
            .to_uppercase();
        ctx.set(RESULT_KEY, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn render_falls_back_to_input_when_no_result_yet() {
        let mut ctx = DispatchContext::new("  raw request  ", vec![]);
        Render.invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.get(RESULT_KEY), Some("raw request"));
    }

    #[tokio::test]
    async fn render_bullet_style() {
        let mut ctx = DispatchContext::new("goal", vec![]);
        ctx.set(RESULT_KEY, "first\nsecond");
        ctx.set(STYLE_KEY, "bullet");
        Render.invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.get(RESULT_KEY), Some("- first\n- second"));
    }

    #[tokio::test]
    async fn uppercase_transforms_result() {
        let mut ctx = DispatchContext::new("goal", vec![]);
        ctx.set(RESULT_KEY, "quiet");
        Uppercase.invoke(&mut ctx).await.unwrap();
        assert_eq!(ctx.get(RESULT_KEY), Some("QUIET"));
    }
}
