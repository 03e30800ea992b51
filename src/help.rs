//! Built-in help for the posmix command line
//!
//! This module documents the command-line options, the fraction strategies,
//! the structure file layout and the settings file.

/// Category for organizing options in the help system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCategory {
    /// Options that select the interpolation fractions.
    Fractions,
    /// Options that control where and what is written.
    Output,
    /// Options that tune the interpolation itself.
    Mixing,
}

/// Documentation entry for a single command-line option.
#[derive(Debug, Clone)]
pub struct OptionInfo {
    /// The option as typed (e.g., "--middle").
    pub name: &'static str,
    /// Placeholder for the option's value, empty for flags.
    pub value: &'static str,
    /// The category to which this option belongs.
    pub category: OptionCategory,
    /// A brief description of what the option does.
    pub description: &'static str,
    /// The default value of the option, if applicable.
    pub default_value: Option<&'static str>,
}

/// All option documentation
pub const OPTIONS: &[OptionInfo] = &[
    OptionInfo {
        name: "--method",
        value: "isometric|arbitrary",
        category: OptionCategory::Fractions,
        description: "Fraction strategy",
        default_value: Some("[mixing] method, or arbitrary when --eta is given"),
    },
    OptionInfo {
        name: "--middle",
        value: "N",
        category: OptionCategory::Fractions,
        description: "Number of evenly spaced fractions strictly between 0 and 1",
        default_value: None,
    },
    OptionInfo {
        name: "--left",
        value: "N",
        category: OptionCategory::Fractions,
        description: "Number of extrapolated fractions below 0",
        default_value: None,
    },
    OptionInfo {
        name: "--right",
        value: "N",
        category: OptionCategory::Fractions,
        description: "Number of extrapolated fractions above 1",
        default_value: None,
    },
    OptionInfo {
        name: "--steps",
        value: "s1[,s2]",
        category: OptionCategory::Fractions,
        description: "Extension step sizes for the present sides, left then right",
        default_value: Some("interior spacing 1/(1+middle)"),
    },
    OptionInfo {
        name: "--eta",
        value: "f1,f2,...",
        category: OptionCategory::Fractions,
        description: "Explicit fractions, used in the given order",
        default_value: None,
    },
    OptionInfo {
        name: "--output",
        value: "DIR",
        category: OptionCategory::Output,
        description: "Directory receiving the fraction folders",
        default_value: Some("current directory"),
    },
    OptionInfo {
        name: "--folder",
        value: "NAME",
        category: OptionCategory::Output,
        description: "Subfolder of the output directory, created if missing",
        default_value: None,
    },
    OptionInfo {
        name: "--aux",
        value: "FILE",
        category: OptionCategory::Output,
        description: "Auxiliary file copied into every folder (repeatable)",
        default_value: None,
    },
    OptionInfo {
        name: "--kpoints",
        value: "FILE",
        category: OptionCategory::Output,
        description: "KPOINTS file copied into every folder",
        default_value: None,
    },
    OptionInfo {
        name: "--incar",
        value: "FILE",
        category: OptionCategory::Output,
        description: "INCAR file copied into every folder",
        default_value: None,
    },
    OptionInfo {
        name: "--potcar",
        value: "FILE",
        category: OptionCategory::Output,
        description: "POTCAR file copied into every folder",
        default_value: None,
    },
    OptionInfo {
        name: "--tolerance",
        value: "EPS",
        category: OptionCategory::Mixing,
        description: "Minimum-image snapping tolerance",
        default_value: Some("[mixing] tolerance = 1e-4"),
    },
    OptionInfo {
        name: "--parallel",
        value: "",
        category: OptionCategory::Mixing,
        description: "Build the structures on all cores",
        default_value: Some("[mixing] parallel = false"),
    },
];

/// Print global help
pub fn print_global_help() {
    println!("posmix - Mixed configurations between two POSCAR structures");
    println!();
    println!("USAGE:");
    println!("    posmix <base> <target> [OPTIONS]");
    println!("    posmix ci posmix_config.cfg");
    println!("    posmix --help [fractions|format|config]");
    println!();
    println!("DESCRIPTION:");
    println!("    Interpolates the fractional coordinates of two structures with the");
    println!("    same atoms and writes one POSCAR per fraction into folders named");
    println!("    eta=<fraction>. Displacements that cross the periodic boundary are");
    println!("    taken along the short path.");
    println!();

    for (category, title) in [
        (OptionCategory::Fractions, "FRACTION OPTIONS:"),
        (OptionCategory::Output, "OUTPUT OPTIONS:"),
        (OptionCategory::Mixing, "MIXING OPTIONS:"),
    ] {
        println!("{}", title);
        for option in OPTIONS.iter().filter(|o| o.category == category) {
            print_option(option);
        }
        println!();
    }

    println!("EXAMPLES:");
    println!("    posmix POSCAR1 POSCAR2 --middle 9");
    println!("    posmix POSCAR1 POSCAR2 --middle 9 --left 4 --right 4 --steps 0.1,0.1");
    println!("    posmix POSCAR1 POSCAR2 --eta 0.25,0.5,0.75 --incar INCAR --kpoints KPOINTS");
    println!();
}

fn print_option(option: &OptionInfo) {
    let usage = if option.value.is_empty() {
        option.name.to_string()
    } else {
        format!("{} {}", option.name, option.value)
    };
    println!("    {:<30} {}", usage, option.description);
    if let Some(default) = option.default_value {
        println!("    {:<30} Default: {}", "", default);
    }
}

/// Print help for 'ci' command
pub fn print_ci_help() {
    println!("Create Settings Template (ci) Command");
    println!("═════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    posmix ci posmix_config.cfg");
    println!();
    println!("DESCRIPTION:");
    println!("    Writes a commented settings file with the built-in defaults into");
    println!("    the current directory. An existing file is never overwritten.");
    println!();
}

/// Print the fraction strategies
pub fn print_fraction_help() {
    println!("FRACTION STRATEGIES");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("isometric");
    println!("    --middle N places N fractions at k/(N+1), k = 1..N.");
    println!("    --left L and --right R add L fractions below 0 and R above 1,");
    println!("    spaced by 1/(N+1) unless --steps gives explicit step sizes.");
    println!("    --steps lists one size per present side, left first; the right");
    println!("    side always takes the last value. Signs are ignored.");
    println!("    The resulting list is sorted ascending.");
    println!();
    println!("    posmix A B --middle 3 --left 1 --right 1");
    println!("        -> -0.25  0.25  0.50  0.75  1.25");
    println!();
    println!("arbitrary");
    println!("    --eta lists the fractions explicitly; they are used as given.");
    println!();
    println!("    posmix A B --eta 0.5,0.1,1.2");
    println!("        -> 0.5  0.1  1.2");
    println!();
}

/// Print the structure file layout
pub fn print_format_help() {
    println!("POSCAR LAYOUT");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("    <title>");
    println!("    <scale factor>");
    println!("    <3 lattice vector lines>");
    println!("    <species names>");
    println!("    <species counts>");
    println!("    <Direct | Cartesian>");
    println!("    <N position lines>");
    println!();
    println!("    <N velocity lines, optional>");
    println!();
    println!("Blank lines are ignored on input. Lines that are not rewritten keep");
    println!("their original text. Rewritten numbers use 14 decimals for the scale");
    println!("factor, 16 for lattice vectors and positions and 8-digit scientific");
    println!("notation for velocities.");
    println!();
    println!("Interpolation treats positions as fractional coordinates; lattice,");
    println!("species and velocities of every output come from the base structure.");
    println!();
}

/// Print the settings file reference
pub fn print_config_help() {
    println!("SETTINGS FILE");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("    posmix reads 'posmix_config.cfg' from, in order of priority:");
    println!("      - ./posmix_config.cfg (local, highest priority)");
    println!("      - ~/.config/posmix/posmix_config.cfg (user)");
    println!("      - /etc/posmix/posmix_config.cfg (system)");
    println!("    Create template:     posmix ci posmix_config.cfg");
    println!();
    println!("[mixing]   tolerance, method, parallel");
    println!("[output]   poscar_name, folder_prefix, precision, write_manifest");
    println!("[logging]  level, file_logging");
    println!();
}

/// Prints help for a topic, falling back to the global help.
pub fn print_topic(topic: &str) {
    match topic {
        "fractions" => print_fraction_help(),
        "format" => print_format_help(),
        "config" => print_config_help(),
        "ci" => print_ci_help(),
        _ => print_global_help(),
    }
}
