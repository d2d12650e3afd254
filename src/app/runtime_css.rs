use crate::ui::StyleTokens;
use gtk4::CssProvider;

/// Styling for the host window and every guide panel.
pub(super) fn runtime_css(tokens: StyleTokens, motion_enabled: bool) -> String {
    let motion_hover_ms = if motion_enabled {
        tokens.motion_hover_ms
    } else {
        0
    };
    format!(
        "
window.taskdock-root {{
  background: @theme_bg_color;
  color: @theme_fg_color;
}}
.taskdock-main {{
  padding: {spacing_16}px;
}}
.taskdock-status {{
  font-size: {body_font_size}px;
  opacity: 0.7;
}}
.taskdock-steps-editor {{
  border-radius: {control_radius}px;
  border: {border_width}px solid alpha(@theme_fg_color, 0.16);
  padding: {spacing_8}px;
}}
.taskdock-preview {{
  border-radius: {card_radius}px;
  border: {border_width}px solid alpha(@theme_fg_color, 0.12);
}}
window.taskdock-panel {{
  background: @theme_bg_color;
  border-radius: {panel_radius}px;
}}
.task-screen {{
  padding: {spacing_16}px;
}}
.task-goal {{
  font-size: {goal_font_size}px;
  font-weight: 700;
}}
.task-hint {{
  font-size: {body_font_size}px;
  opacity: 0.72;
}}
.task-steps {{
  margin-top: {spacing_8}px;
}}
.task-step {{
  border-radius: {card_radius}px;
  padding: {spacing_8}px {spacing_12}px;
  font-size: {body_font_size}px;
}}
.task-step.current {{
  background: alpha(@theme_selected_bg_color, 0.16);
  border: {border_width}px solid alpha(@theme_selected_bg_color, 0.48);
}}
.task-step.done {{
  opacity: 0.55;
}}
.task-marker {{
  min-width: {spacing_16}px;
}}
.task-complete {{
  font-weight: 600;
  color: @success_color;
}}
.task-loading {{
  padding: {spacing_4}px 0;
}}
button.task-done-button,
button.task-start-over {{
  border-radius: {control_radius}px;
  min-height: {control_height}px;
  transition: box-shadow {motion_hover_ms}ms cubic-bezier(0.4, 0, 0.2, 1);
}}
button.task-done-button:hover,
button.task-start-over:hover {{
  box-shadow: 0 0 0 1.5px alpha(@theme_selected_bg_color, 0.4);
}}
",
        spacing_4 = tokens.spacing_4,
        spacing_8 = tokens.spacing_8,
        spacing_12 = tokens.spacing_12,
        spacing_16 = tokens.spacing_16,
        card_radius = tokens.card_radius,
        panel_radius = tokens.panel_radius,
        control_radius = tokens.control_radius,
        control_height = tokens.control_height,
        border_width = tokens.border_width,
        goal_font_size = tokens.goal_font_size,
        body_font_size = tokens.body_font_size,
        motion_hover_ms = motion_hover_ms,
    )
}

pub(super) fn install_runtime_css(css: &str) {
    let provider = CssProvider::new();
    provider.load_from_data(css);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
