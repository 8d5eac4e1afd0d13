//! Category filtering for desktop entries.
//!
//! Desktop files carry toolkit and environment noise in their `Categories`
//! field; only names from the registered freedesktop menu categories end up
//! on a component.

/// Categories that are dropped silently: toolkit and environment markers
/// that carry no information about the application itself.
pub const CATEGORY_BLACKLIST: &[&str] = &["GTK", "Qt", "GNOME", "KDE", "GUI", "Application"];

/// Registered freedesktop menu categories (main and additional).
const VALID_CATEGORIES: &[&str] = &[
    // Main categories
    "AudioVideo",
    "Audio",
    "Video",
    "Development",
    "Education",
    "Game",
    "Graphics",
    "Network",
    "Office",
    "Science",
    "Settings",
    "System",
    "Utility",
    // Additional categories
    "2DGraphics",
    "3DGraphics",
    "Accessibility",
    "ActionGame",
    "AdventureGame",
    "Amusement",
    "ArcadeGame",
    "Archiving",
    "ArtificialIntelligence",
    "Astronomy",
    "AudioVideoEditing",
    "Biology",
    "BlocksGame",
    "BoardGame",
    "Building",
    "Calculator",
    "Calendar",
    "CardGame",
    "Chart",
    "Chat",
    "Chemistry",
    "Clock",
    "Compression",
    "ComputerScience",
    "ContactManagement",
    "Core",
    "Database",
    "DataVisualization",
    "Debugger",
    "DesktopSettings",
    "Dialup",
    "Dictionary",
    "DiscBurning",
    "Documentation",
    "Economy",
    "Electricity",
    "Electronics",
    "Email",
    "Emulator",
    "Engineering",
    "Feed",
    "FileManager",
    "FileTools",
    "FileTransfer",
    "Filesystem",
    "Finance",
    "FlowChart",
    "Geography",
    "Geology",
    "Geoscience",
    "GUIDesigner",
    "HamRadio",
    "HardwareSettings",
    "History",
    "Humanities",
    "IDE",
    "ImageProcessing",
    "InstantMessaging",
    "IRCClient",
    "KidsGame",
    "Languages",
    "Literature",
    "LogicGame",
    "Maps",
    "Math",
    "MedicalSoftware",
    "Midi",
    "Mixer",
    "Monitor",
    "Music",
    "News",
    "NumericalAnalysis",
    "OCR",
    "P2P",
    "PackageManager",
    "ParallelComputing",
    "PDA",
    "Photography",
    "Physics",
    "Player",
    "Presentation",
    "Printing",
    "Profiling",
    "ProjectManagement",
    "Publishing",
    "RasterGraphics",
    "Recorder",
    "RemoteAccess",
    "RevisionControl",
    "Robotics",
    "RolePlaying",
    "Scanning",
    "Security",
    "Sequencer",
    "Shooter",
    "Simulation",
    "Sports",
    "SportsGame",
    "Spreadsheet",
    "Spirituality",
    "StrategyGame",
    "Telephony",
    "TelephonyTools",
    "TerminalEmulator",
    "TextEditor",
    "TextTools",
    "Translation",
    "Tuner",
    "TV",
    "VectorGraphics",
    "VideoConference",
    "Viewer",
    "WebBrowser",
    "WebDevelopment",
    "WordProcessor",
];

/// Whether a category name is part of the registered list.
pub fn is_valid_category(name: &str) -> bool {
    VALID_CATEGORIES.contains(&name)
}

/// Whether a category is dropped without a hint (toolkit noise or an
/// `x-`-prefixed vendor extension).
pub fn is_blacklisted(name: &str) -> bool {
    CATEGORY_BLACKLIST.contains(&name) || name.to_lowercase().starts_with("x-")
}
