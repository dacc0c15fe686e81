//! Prompt builders for every outbound call.
//!
//! The analysis and research prompts ask for the exact section layout the
//! parser understands (`Overview:`, `Engine Details:`, `Interior & Features:`
//! plus `Key: value` metric lines).

use super::types::Lang;

/// Photo analysis prompt. Always English: the record is normalized later.
pub const ANALYSIS_PROMPT: &str = "\
Analyze this car image and provide the following information in this EXACT format:
Brand: (manufacturer name)
Model: (model name)
Year: (specific year or year range)
Price: (price range in USD)
Performance:
- Power: (exact HP number or range)
- 0-60 mph: (exact seconds)
- Top Speed: (exact km/h)

Description:
Overview:
(Write 2-3 sentences about the car's overall characteristics)

Engine Details:
- Configuration: (engine type and layout)
- Displacement: (in liters)
- Turbo/Supercharging: (if applicable)
- Transmission: (type and speeds)

Interior & Features:
- Seating: (material and configuration)
- Dashboard: (key features)
- Technology: (main tech features)
- Key Features: (list 3-4 standout features)

Note: Please maintain the exact format with proper line breaks and section headers.";

/// Connectivity probe sent by `GET /test_api`.
pub const PROBE_PROMPT: &str = "Hello, this is a test message.";

/// Which sections a general research query should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchScope {
    /// Overview, engine, interior and the three metrics.
    Full,
    /// Engine section only (second attempt of the engine stage).
    EngineOnly,
}

/// General research prompt for filling metric and section gaps.
pub fn build_research_prompt(car_name: &str, scope: ResearchScope, lang: Lang) -> String {
    let engine_section = "\
Engine Details:
- Engine type: (e.g. V8, V6, inline-4, hybrid, electric, etc.)
- Displacement: (in liters or cc)
- Induction: (turbocharged, supercharged, naturally aspirated, etc.)
- Transmission: (manual, automatic, dual-clutch, number of speeds)
- Drivetrain: (RWD, AWD, FWD, etc.)
If you cannot find the exact engine for this model/year, provide the most likely or typical engine for this car line, and clearly state it is an estimate.";

    let body = match scope {
        ResearchScope::Full => format!(
            "Return the result in exactly these sections, in this order:

Performance:
- Power: (in hp or kW)
- 0-60 mph: (in seconds)
- Top Speed: (in km/h)

Overview:
(2-3 sentences about the car's overall characteristics)

{engine_section}

Interior & Features:
- Seating: (material and configuration)
- Dashboard: (key features)
- Technology: (main tech features)
- Key Features: (list 3-4 standout features)"
        ),
        ResearchScope::EngineOnly => format!(
            "Return only the following section:

{engine_section}"
        ),
    };

    format!(
        "Research and provide accurate information about the car model: {car_name}.
{body}

Keep the section headers and field labels in English exactly as written; write the values in {language}.
Do not return \"No information available\". Always provide the most likely real-world information, or a well-informed estimate for each section.",
        language = lang.display_name(),
    )
}

/// Dedicated engine-specification prompt (first attempt of the engine stage).
pub fn build_engine_prompt(car_name: &str, lang: Lang) -> String {
    format!(
        "Research and provide detailed engine specifications for {car_name}. Answer in {language}, as bullet points grouped into these sections:

1. Engine specifications:
- Engine type: (V6, V8, inline-4, hybrid, electric, etc.)
- Displacement: (cc or L)
- Power: (hp or kW)
- Torque: (Nm)
- Induction: (turbo, supercharger, naturally aspirated)
- Fuel system: (direct injection, port injection, etc.)
- Emission standard: (Euro 6, Euro 5, etc.)

2. Drivetrain:
- Gearbox type: (automatic, manual, dual-clutch)
- Number of gears: (6-speed, 8-speed, etc.)
- Drive layout: (FWD, RWD, AWD)

3. Performance:
- 0-100 km/h acceleration time
- Top speed
- Fuel consumption: (l/100km)
- Fuel tank capacity: (L)

4. Special technology:
- Fuel saving systems: (start/stop, cylinder deactivation, etc.)
- Forced induction technology: (twin-turbo, bi-turbo, etc.)

If exact information cannot be found, provide estimates based on similar versions of the same car line. Do not answer that no information is available.",
        language = lang.display_name(),
    )
}

/// Translation prompt for one paragraph-like unit.
pub fn build_translation_prompt(unit: &str, target: Lang) -> String {
    let language = target.display_name();
    let extra_rules = match target {
        Lang::Vi => "\n4. Keep technical terms in their common Vietnamese form (e.g. 'turbo' -> 'tăng áp', 'hybrid' -> 'hybrid')\
                     \n5. Maintain bullet points and formatting\
                     \n6. Keep any Vietnamese text as is",
        Lang::En => "\n4. Keep technical terms in their common English form\
                     \n5. Maintain bullet points and formatting",
    };
    format!(
        "Translate the following car information to {language}. Keep all numbers, units and technical specifications as is:

{unit}

Translation rules:
1. Keep all numbers and units (hp, km/h, etc) unchanged
2. Keep car brand names and technical abbreviations unchanged
3. Translate all descriptions and features to {language}{extra_rules}

Return only the translated text."
    )
}
