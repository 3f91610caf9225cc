//! Bus listing command implementation

use iic_common::config::BoardConfig;

/// Print the board's logical bus table
pub fn buses(config: &BoardConfig) {
    println!();
    print!("{}", render_buses(config));
    println!();
}

fn render_buses(config: &BoardConfig) -> String {
    let mut out = format!("Board: {}\n", config.board);
    if let Some(hz) = config.frequency {
        out.push_str(&format!("Frequency: {} Hz\n", hz));
    }

    for (id, raw) in &config.buses {
        let device = config.dev_dir.join(format!("i2c-{}", raw));
        let status = if device.exists() { "present" } else { "missing" };
        let marker = if *id == config.default_bus { "*" } else { " " };
        out.push_str(&format!(
            "{} bus {:<3} -> {:<16} {}\n",
            marker,
            id,
            device.display().to_string(),
            status
        ));
    }

    out
}
