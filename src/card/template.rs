use thiserror::Error;

/// Geometry, color and typography constants for one card style. All styles
/// share the same layout algorithm; only these values differ.
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    pub width: u32,
    pub height: u32,
    pub background_color: [u8; 3],
    pub text_color: [u8; 3],
    pub accent_color: [u8; 3],
    /// Path tried first when loading fonts; the embedded faces are the
    /// fallback.
    pub font_path: &'static str,
    pub title_font_size: f32,
    pub body_font_size: f32,
    pub price_font_size: f32,
    /// Character budgets for the greedy word wrap.
    pub title_wrap: usize,
    pub body_wrap: usize,
    pub side_margin: u32,
    pub photo_top: u32,
    pub photo_region_height: u32,
    pub price_banner_height: u32,
    /// Dark style draws a thin accent stripe along the top edge.
    pub top_accent_stripe: bool,
    /// Marketplace style draws the category label on an accent chip.
    pub category_chip: bool,
}

const FONT_PATH: &str = "assets/fonts/DejaVuSans.ttf";

const MINIMAL: TemplateDescriptor = TemplateDescriptor {
    width: 800,
    height: 800,
    background_color: [255, 255, 255],
    text_color: [40, 40, 40],
    accent_color: [0, 122, 255],
    font_path: FONT_PATH,
    title_font_size: 36.0,
    body_font_size: 18.0,
    price_font_size: 42.0,
    title_wrap: 40,
    body_wrap: 55,
    side_margin: 40,
    photo_top: 20,
    photo_region_height: 350,
    price_banner_height: 80,
    top_accent_stripe: false,
    category_chip: false,
};

const DARK: TemplateDescriptor = TemplateDescriptor {
    width: 800,
    height: 800,
    background_color: [20, 20, 30],
    text_color: [240, 240, 240],
    accent_color: [255, 100, 100],
    font_path: FONT_PATH,
    title_font_size: 36.0,
    body_font_size: 18.0,
    price_font_size: 42.0,
    title_wrap: 40,
    body_wrap: 55,
    side_margin: 40,
    photo_top: 20,
    photo_region_height: 350,
    price_banner_height: 80,
    top_accent_stripe: true,
    category_chip: false,
};

const MARKETPLACE: TemplateDescriptor = TemplateDescriptor {
    width: 800,
    height: 800,
    background_color: [245, 245, 250],
    text_color: [35, 35, 35],
    accent_color: [0, 184, 148],
    font_path: FONT_PATH,
    title_font_size: 32.0,
    body_font_size: 16.0,
    price_font_size: 40.0,
    title_wrap: 40,
    body_wrap: 60,
    side_margin: 40,
    photo_top: 20,
    photo_region_height: 350,
    price_banner_height: 80,
    top_accent_stripe: false,
    category_chip: true,
};

#[derive(Debug, Error)]
#[error("template '{requested}' not found; available: {available}")]
pub struct TemplateNotFound {
    pub requested: String,
    pub available: String,
}

/// Closed set of card styles. Adding a style means adding a variant and its
/// descriptor constant; the rendering algorithm stays shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStyle {
    Minimal,
    Dark,
    Marketplace,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 3] = [
        TemplateStyle::Minimal,
        TemplateStyle::Dark,
        TemplateStyle::Marketplace,
    ];

    pub fn from_name(name: &str) -> Result<TemplateStyle, TemplateNotFound> {
        match name.trim().to_lowercase().as_str() {
            "minimal" => Ok(TemplateStyle::Minimal),
            "dark" => Ok(TemplateStyle::Dark),
            "marketplace" => Ok(TemplateStyle::Marketplace),
            _ => Err(TemplateNotFound {
                requested: name.to_string(),
                available: TemplateStyle::ALL
                    .iter()
                    .map(|style| style.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateStyle::Minimal => "minimal",
            TemplateStyle::Dark => "dark",
            TemplateStyle::Marketplace => "marketplace",
        }
    }

    /// Human-readable label shown on the selection keyboard.
    pub fn label(self) -> &'static str {
        match self {
            TemplateStyle::Minimal => "📱 Минимал",
            TemplateStyle::Dark => "🌙 Тёмный",
            TemplateStyle::Marketplace => "🛒 Маркетплейс",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TemplateStyle::Minimal => {
                "Чистый, минималистичный дизайн с большим количеством пространства."
            }
            TemplateStyle::Dark => "Тёмный фон с яркими акцентами. Для премиум-товаров.",
            TemplateStyle::Marketplace => {
                "Стиль карточки маркетплейса: цветная плашка категории и блок цены."
            }
        }
    }

    pub fn descriptor(self) -> &'static TemplateDescriptor {
        match self {
            TemplateStyle::Minimal => &MINIMAL,
            TemplateStyle::Dark => &DARK,
            TemplateStyle::Marketplace => &MARKETPLACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_styles_by_name_case_insensitively() {
        assert_eq!(
            TemplateStyle::from_name("minimal").unwrap(),
            TemplateStyle::Minimal
        );
        assert_eq!(
            TemplateStyle::from_name(" Dark ").unwrap(),
            TemplateStyle::Dark
        );
    }

    #[test]
    fn unknown_style_error_lists_available_names() {
        let err = TemplateStyle::from_name("neon").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("neon"));
        assert!(message.contains("minimal"));
        assert!(message.contains("dark"));
        assert!(message.contains("marketplace"));
    }

    #[test]
    fn every_style_has_a_descriptor_with_plausible_geometry() {
        for style in TemplateStyle::ALL {
            let descriptor = style.descriptor();
            assert!(descriptor.width > 0 && descriptor.height > 0);
            assert!(descriptor.price_banner_height < descriptor.height);
            assert!(descriptor.photo_top + descriptor.photo_region_height < descriptor.height);
        }
    }
}
