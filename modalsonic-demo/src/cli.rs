use anyhow::{Result, bail};
use modalsonic::Material;

/// Command line options of the demo
#[derive(Debug, Clone)]
pub struct Options {
    /// Run the simulation as fast as possible without opening a device
    pub headless: bool,
    /// Simulated time in seconds
    pub seconds: f32,
    /// Simulation frame rate
    pub fps: f32,
    /// Scale from summed modal amplitude to output sample
    pub gain: f32,
    pub material: Material,
    pub material_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            headless: false,
            seconds: 5.0,
            fps: 60.0,
            gain: 20.0,
            material: Material::STEEL,
            material_name: "steel".into(),
        }
    }
}

pub const USAGE: &str = "\
usage: modalsonic-demo [--headless] [--seconds N] [--fps N] [--gain G] [--material NAME]

  --headless       simulate without audio output and print statistics
  --seconds N      simulated duration (default 5)
  --fps N          simulation frame rate (default 60)
  --gain G         output gain applied to the modal amplitudes (default 20)
  --material NAME  steel, ceramic, glass or plastic (default steel)";

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Options>> {
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => options.headless = true,
            "--seconds" => options.seconds = parse_positive(&arg, args.next())?,
            "--fps" => options.fps = parse_positive(&arg, args.next())?,
            "--gain" => options.gain = parse_positive(&arg, args.next())?,
            "--material" => {
                let Some(name) = args.next() else {
                    bail!("--material needs a value");
                };
                let Some(material) = Material::preset(&name) else {
                    bail!("unknown material '{}'", name);
                };
                options.material = material;
                options.material_name = name.to_ascii_lowercase();
            }
            "-h" | "--help" => return Ok(None),
            other => bail!("unknown argument '{}'\n\n{}", other, USAGE),
        }
    }

    Ok(Some(options))
}

fn parse_positive(flag: &str, value: Option<String>) -> Result<f32> {
    let Some(value) = value else {
        bail!("{} needs a value", flag);
    };
    let parsed: f32 = value.parse()?;
    if !(parsed > 0.0 && parsed.is_finite()) {
        bail!("{} must be positive, got {}", flag, value);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let options = parse_args(args(&[])).unwrap().unwrap();
        assert!(!options.headless);
        assert_eq!(options.material, Material::STEEL);
    }

    #[test]
    fn test_flags() {
        let options = parse_args(args(&[
            "--headless",
            "--seconds",
            "2.5",
            "--material",
            "Glass",
        ]))
        .unwrap()
        .unwrap();
        assert!(options.headless);
        assert_eq!(options.seconds, 2.5);
        assert_eq!(options.material, Material::GLASS);
        assert_eq!(options.material_name, "glass");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_args(args(&["--seconds", "-1"])).is_err());
        assert!(parse_args(args(&["--material", "cheese"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }
}
