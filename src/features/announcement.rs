//! Announcement embeds posted by staff: free-form ones with a chosen colour, and ones
//! built from a fixed set of templates.

use serenity::all::Colour;
use thiserror::Error;

const MAX_TITLE_LENGTH: usize = 256;
const MAX_DESCRIPTION_LENGTH: usize = 4096;
const MAX_FOOTER_LENGTH: usize = 2048;
const MAX_AUTHOR_LENGTH: usize = 256;

pub const DEFAULT_COLOUR: Colour = Colour::BLUE;

/// Colours accepted by name, in the order they are advertised.
pub const NAMED_COLOURS: &[(&str, Colour)] = &[
    ("red", Colour::RED),
    ("green", Colour::new(0x2ECC71)),
    ("blue", Colour::BLUE),
    ("orange", Colour::ORANGE),
    ("purple", Colour::PURPLE),
    ("pink", Colour::MAGENTA),
    ("gold", Colour::GOLD),
    ("grey", Colour::LIGHT_GREY),
    ("dark_grey", Colour::DARK_GREY),
    ("yellow", Colour::new(0xFFFF00)),
    ("cyan", Colour::new(0x00FFFF)),
    ("black", Colour::new(0x000000)),
    ("white", Colour::new(0xFFFFFF)),
];

/// Accepts a colour name (case-insensitive) or a six digit hex code with or without `#`.
pub fn parse_colour(input: &str) -> Option<Colour> {
    let input = input.trim().to_lowercase();
    if let Some((_, colour)) = NAMED_COLOURS.iter().find(|(name, _)| *name == input) {
        return Some(*colour);
    }
    let hex = input.strip_prefix('#').unwrap_or(&input);
    if hex.len() != 6 || !hex.chars().all(|x| x.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(Colour::new)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Template {
    #[name = "announcement"]
    Announcement,
    #[name = "rules"]
    Rules,
    #[name = "information"]
    Information,
    #[name = "notice"]
    Notice,
    #[name = "event"]
    Event,
    #[name = "welcome"]
    Welcome,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Template::Announcement,
        Template::Rules,
        Template::Information,
        Template::Notice,
        Template::Event,
        Template::Welcome,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Template::Announcement => "Announcement",
            Template::Rules => "Rules",
            Template::Information => "Information",
            Template::Notice => "Notice",
            Template::Event => "Event",
            Template::Welcome => "Welcome",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Template::Announcement => "📢",
            Template::Rules => "📋",
            Template::Information => "ℹ️",
            Template::Notice => "⚠️",
            Template::Event => "🎉",
            Template::Welcome => "👋",
        }
    }

    pub fn colour(self) -> Colour {
        match self {
            Template::Announcement => Colour::BLUE,
            Template::Rules => Colour::RED,
            Template::Information => Colour::new(0x2ECC71),
            Template::Notice => Colour::ORANGE,
            Template::Event => Colour::PURPLE,
            Template::Welcome => Colour::GOLD,
        }
    }

    pub fn footer(self) -> &'static str {
        match self {
            Template::Announcement => "Official server announcement",
            Template::Rules => "Server rules, compliance is mandatory",
            Template::Information => "Server information",
            Template::Notice => "Important notice",
            Template::Event => "Server event",
            Template::Welcome => "Welcome aboard!",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnouncementError {
    #[error("the {field} must not be empty")]
    Empty { field: &'static str },
    #[error("the {field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Everything needed to render an announcement embed.
#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub title: String,
    pub description: String,
    pub colour: Colour,
    pub footer: Option<String>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
}

impl Announcement {
    pub fn new<T: Into<String>, D: Into<String>>(title: T, description: D) -> Self {
        Announcement {
            title: title.into(),
            description: description.into(),
            colour: DEFAULT_COLOUR,
            footer: None,
            author: None,
            thumbnail: None,
        }
    }

    /// Prefixes the title with the template's emoji and takes its colour and footer.
    pub fn from_template<T: AsRef<str>, D: Into<String>>(
        template: Template,
        title: T,
        description: D,
    ) -> Self {
        Announcement {
            colour: template.colour(),
            footer: Some(template.footer().to_string()),
            ..Announcement::new(
                format!("{} {}", template.emoji(), title.as_ref()),
                description,
            )
        }
    }

    /// Checks the text against the embed limits before anything is sent.
    pub fn validate(&self) -> Result<(), AnnouncementError> {
        check("title", &self.title, MAX_TITLE_LENGTH, true)?;
        check("description", &self.description, MAX_DESCRIPTION_LENGTH, true)?;
        if let Some(footer) = &self.footer {
            check("footer", footer, MAX_FOOTER_LENGTH, false)?;
        }
        if let Some(author) = &self.author {
            check("author", author, MAX_AUTHOR_LENGTH, false)?;
        }
        Ok(())
    }
}

fn check(
    field: &'static str,
    value: &str,
    max: usize,
    required: bool,
) -> Result<(), AnnouncementError> {
    if required && value.trim().is_empty() {
        return Err(AnnouncementError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(AnnouncementError::TooLong { field, max });
    }
    Ok(())
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
pub fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max).collect();
    short.push_str("...");
    short
}
