/// Compile-time layout tokens shared by the host window and the guide panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleTokens {
    pub spacing_4: i32,
    pub spacing_8: i32,
    pub spacing_12: i32,
    pub spacing_16: i32,
    pub card_radius: u16,
    pub panel_radius: u16,
    pub control_radius: u16,
    pub control_height: u16,
    pub border_width: u16,
    pub main_window_width: i32,
    pub main_window_height: i32,
    pub preview_height: i32,
    pub goal_font_size: u16,
    pub body_font_size: u16,
    pub motion_hover_ms: u32,
}

pub const LAYOUT_TOKENS: StyleTokens = StyleTokens {
    spacing_4: 4,
    spacing_8: 8,
    spacing_12: 12,
    spacing_16: 16,
    card_radius: 12,
    panel_radius: 16,
    control_radius: 10,
    control_height: 34,
    border_width: 1,
    main_window_width: 520,
    main_window_height: 560,
    preview_height: 180,
    goal_font_size: 16,
    body_font_size: 13,
    motion_hover_ms: 160,
};
