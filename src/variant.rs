use std::fmt::{Display, Formatter};

/// A known distribution of the game.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Variant {
    /// The original Ludum Dare 22 release.
    Original,
    /// Minicraft Delux.
    Delux,
    /// Minicraft+.
    Plus,
}
impl Variant {
    pub fn id(&self) -> &'static str {
        match self {
            Variant::Original => "minicraft",
            Variant::Delux => "minicraft-delux",
            Variant::Plus => "minicraftplus",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Original => "Minicraft",
            Variant::Delux => "Minicraft Delux",
            Variant::Plus => "MinicraftPlus",
        }
    }

    /// The metadata describing this variant as a built-in mod.
    pub fn metadata(&self) -> GameMetadata {
        match self {
            Variant::Original => {
                let contact = &[("homepage", "https://en.wikipedia.org/wiki/Minicraft")];
                GameMetadata {
                    id: self.id(),
                    name: self.name(),
                    author: "Notch",
                    contact,
                    description: "A 2D top-down action game designed and programmed by Markus \
                                  Persson, the creator of Minecraft, for a Ludum Dare, a 48-hour \
                                  game programming competition.",
                }
            }
            Variant::Delux => {
                let contact = &[
                    ("homepage", "https://playminicraft.com/"),
                    ("wiki", "Lost to time and space..."),
                ];
                GameMetadata {
                    id: self.id(),
                    name: self.name(),
                    author: "Samuel Werder",
                    contact,
                    description: "A modded version of Minicraft made by Samuel Werder, adding a \
                                  saves system, a respawn mechanic, an in-game map, working \
                                  terrain height, stairs, new monsters, a day/night cycle, and \
                                  more!",
                }
            }
            Variant::Plus => {
                let contact = &[
                    ("homepage", "https://playminicraft.com/"),
                    ("wiki", "https://github.com/chrisj42/minicraft-plus-revived/wiki"),
                    ("discord", "https://discord.com/invite/nvyd3Mrj"),
                    ("issues", "https://github.com/MinicraftPlus/minicraft-plus-revived/issues"),
                ];
                GameMetadata {
                    id: self.id(),
                    name: self.name(),
                    author: "Minicraft+ Contributors",
                    contact,
                    description: "Minicraft+ is a modded version of Minicraft that adds many more \
                                  features to the original version. The original Minicraft game \
                                  was made by Markus 'Notch' Persson in the Ludum Dare 22 \
                                  contest.",
                }
            }
        }
    }
}
impl Default for Variant {
    fn default() -> Self {
        Variant::Original
    }
}
impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The built-in mod record for a variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GameMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub author: &'static str,
    /// Contact links, as `(kind, link)` pairs.
    pub contact: &'static [(&'static str, &'static str)],
    pub description: &'static str,
}

/// An archive entry whose presence identifies a variant.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VariantProbe {
    pub entry: String,
    pub variant: Variant,
}
impl VariantProbe {
    pub fn new(entry: &str, variant: Variant) -> Self {
        VariantProbe {
            entry: entry.to_string(),
            variant,
        }
    }

    /// The known layouts, most specific first.
    pub fn defaults() -> Vec<VariantProbe> {
        vec![
            VariantProbe::new("minicraft/core/Game.class", Variant::Plus),
            VariantProbe::new("minicraft/Game.class", Variant::Plus),
            VariantProbe::new("com/mojang/ld22/GameControl.class", Variant::Delux),
            VariantProbe::new("com/mojang/ld22/Game.class", Variant::Original),
        ]
    }
}

/// A matched probe: the variant, and the entry holding its version information.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Classification {
    pub variant: Variant,
    pub version_holder: String,
}

/// Returns the first probe, in order, whose entry exists.
///
/// `None` means the archive is not any known variant. Callers should fall back to defaults
/// rather than fail.
pub fn classify(
    probes: &[VariantProbe],
    mut has_entry: impl FnMut(&str) -> bool,
) -> Option<Classification> {
    probes.iter().find(|x| has_entry(&x.entry)).map(|x| Classification {
        variant: x.variant,
        version_holder: x.entry.clone(),
    })
}
