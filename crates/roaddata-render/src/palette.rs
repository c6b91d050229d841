use roaddata_core::{CategoryClass, Color, RoadMapStyle};

/// Category → color lookup built from the configured class table.
///
/// The class order doubles as the legend order, so a resolved category
/// reports the index of its class rather than just a color.
#[derive(Debug, Clone)]
pub struct Palette {
    classes: Vec<CategoryClass>,
    default_color: Color,
}

/// Result of looking a category up in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub color: Color,
    /// Index into the class table; `None` for categories not in the table.
    pub class: Option<usize>,
}

impl Palette {
    pub fn new(classes: Vec<CategoryClass>, default_color: Color) -> Self {
        Self {
            classes,
            default_color,
        }
    }

    pub fn from_style(style: &RoadMapStyle) -> Self {
        Self::new(style.classes.clone(), style.default_color)
    }

    /// `None` is the NULL category. The first matching class wins.
    pub fn resolve(&self, category: Option<&str>) -> Resolved {
        match self
            .classes
            .iter()
            .position(|c| c.value.as_deref() == category)
        {
            Some(i) => Resolved {
                color: self.classes[i].color,
                class: Some(i),
            },
            None => Resolved {
                color: self.default_color,
                class: None,
            },
        }
    }

    pub fn classes(&self) -> &[CategoryClass] {
        &self.classes
    }

    pub fn default_color(&self) -> Color {
        self.default_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(
            vec![
                CategoryClass::new(Some("A"), "A", Color::RED),
                CategoryClass::new(Some("B"), "B", Color::GREEN),
                CategoryClass::new(None, "unset", Color::GRAY),
            ],
            Color::rgb(1, 2, 3),
        )
    }

    #[test]
    fn known_categories_resolve_to_their_class() {
        let p = palette();
        assert_eq!(
            p.resolve(Some("B")),
            Resolved {
                color: Color::GREEN,
                class: Some(1)
            }
        );
        assert_eq!(p.resolve(None).class, Some(2));
    }

    #[test]
    fn unknown_categories_use_default_color() {
        let p = palette();
        assert_eq!(
            p.resolve(Some("Z")),
            Resolved {
                color: Color::rgb(1, 2, 3),
                class: None
            }
        );
        // Lookup is exact: no case folding or trimming.
        assert_eq!(p.resolve(Some("a")).class, None);
    }

    #[test]
    fn null_without_null_class_is_unknown() {
        let p = Palette::new(
            vec![CategoryClass::new(Some("A"), "A", Color::RED)],
            Color::GRAY,
        );
        assert_eq!(p.resolve(None).class, None);
        assert_eq!(p.resolve(None).color, Color::GRAY);
    }
}
