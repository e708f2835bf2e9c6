use std::path::Path;

use console::Style;
use thon_core::estimate::water_ring::WaterRingEllipse;
use thon_core::pipeline::config::FitConfig;
use thon_core::pipeline::FitOutcome;
use thon_core::spectrum::PowerSpectrum;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            warning: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_fit_summary(
    input: &Path,
    spectrum: &PowerSpectrum,
    config: &FitConfig,
    outcome: &FitOutcome,
) {
    let s = Styles::new();
    let p = &outcome.params;

    println!();
    println!("  {}", s.title.apply_to("CTF Fit"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(7)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Spectrum"),
        s.value.apply_to(format!(
            "{}x{} at {} A/pixel",
            spectrum.width(),
            spectrum.height(),
            spectrum.sampling
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Resolution"),
        s.value.apply_to(format!(
            "{} - {} A",
            config.resolution.lores, config.resolution.hires
        ))
    );
    println!();

    println!("  {}", s.header.apply_to("Microscope"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Voltage"),
        s.value.apply_to(format!("{:.0} kV", p.microscope.voltage / 1e3))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Cs"),
        s.value.apply_to(format!("{:.2} mm", p.microscope.cs / 1e7))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Amp. contr."),
        s.value.apply_to(format!("{:.3}", p.microscope.amplitude_contrast))
    );
    println!();

    println!("  {}", s.header.apply_to("Defocus"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Average"),
        s.value.apply_to(format!("{:.1} A", p.defocus_average))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Deviation"),
        s.value.apply_to(format!("{:.1} A", p.defocus_deviation))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Angle"),
        s.value.apply_to(format!("{:.1} deg", p.astigmatism_angle.to_degrees()))
    );
    println!();

    println!("  {}", s.header.apply_to("Background"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Baseline"),
        s.method.apply_to(p.baseline.family())
    );
    println!("    {:<12}{}", "", p.baseline);
    println!(
        "    {:<12}{}",
        s.label.apply_to("Envelope"),
        s.method.apply_to(p.envelope.family())
    );
    println!("    {:<12}{}", "", p.envelope);
    println!();

    println!("  {}", s.header.apply_to("Quality"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("FOM"),
        s.value.apply_to(format!("{:.4}", p.fom))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Residual"),
        s.value.apply_to(format!("{:.4}", outcome.residual))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Water ring"),
        s.value.apply_to(format!("{:.4}", p.water_ring_index))
    );
    let rounds = format!("{}", outcome.rounds);
    if outcome.converged {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rounds"),
            s.value.apply_to(rounds)
        );
    } else {
        println!(
            "    {:<12}{} {}",
            s.label.apply_to("Rounds"),
            s.value.apply_to(rounds),
            s.warning.apply_to("(not converged)")
        );
    }
    println!();
}

pub fn print_water_ring(ring: Option<&WaterRingEllipse>) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Water ring"));
    let Some(ring) = ring else {
        println!("    {}", s.warning.apply_to("No ring found"));
        println!();
        return;
    };
    println!(
        "    {:<12}{}",
        s.label.apply_to("Location"),
        s.value.apply_to(format!(
            "{:.4} 1/A ({:.2} A)",
            ring.ring.location,
            ring.ring.resolution()
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Width"),
        s.value.apply_to(format!("{:.4} 1/A", ring.ring.width))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Ellipticity"),
        s.value.apply_to(format!(
            "{:.4} 1/A at {:.1} deg",
            ring.ellipticity,
            ring.angle.to_degrees()
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Residual"),
        s.value.apply_to(format!("{:.4}", ring.ring.residual))
    );
    println!();
}
