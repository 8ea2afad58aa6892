use super::model::{Category, Formula, NewFormula};
use crate::clock::Clock;
use crate::model::Record;
use crate::service::{Entity, EntityService, ServiceResult};
use crate::store::{Query, Store};
use std::sync::Arc;

struct SeedFormula {
    name: &'static str,
    formula_text: &'static str,
    description_text: &'static str,
    variables: &'static str,
}

struct SeedCategory {
    name: &'static str,
    icon_name: &'static str,
    color_hex: &'static str,
    formulas: &'static [SeedFormula],
}

const DEFAULT_CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        name: "Math",
        icon_name: "function",
        color_hex: "FF6B6B",
        formulas: &[
            SeedFormula {
                name: "Pythagorean theorem",
                formula_text: "a² + b² = c²",
                description_text: "The square of the hypotenuse equals the sum of the squares of the legs.",
                variables: "a,b,c",
            },
            SeedFormula {
                name: "Circle area",
                formula_text: "S = πr²",
                description_text: "Area of a circle from its radius.",
                variables: "S,r",
            },
            SeedFormula {
                name: "Quadratic formula",
                formula_text: "x = (-b ± √(b² - 4ac)) / 2a",
                description_text: "Roots of the equation ax² + bx + c = 0.",
                variables: "x,a,b,c",
            },
            SeedFormula {
                name: "Circumference",
                formula_text: "C = 2πr",
                description_text: "Length of a circle from its radius.",
                variables: "C,r",
            },
            SeedFormula {
                name: "Triangle area",
                formula_text: "S = ½ah",
                description_text: "Half the base times the height.",
                variables: "S,a,h",
            },
        ],
    },
    SeedCategory {
        name: "Physics",
        icon_name: "atom",
        color_hex: "4ECDC4",
        formulas: &[
            SeedFormula {
                name: "Newton's second law",
                formula_text: "F = ma",
                description_text: "Force equals mass times acceleration.",
                variables: "F,m,a",
            },
            SeedFormula {
                name: "Kinetic energy",
                formula_text: "E = mv²/2",
                description_text: "Energy of a body in motion.",
                variables: "E,m,v",
            },
            SeedFormula {
                name: "Mass-energy equivalence",
                formula_text: "E = mc²",
                description_text: "Energy contained in a mass at rest.",
                variables: "E,m,c",
            },
            SeedFormula {
                name: "Ohm's law",
                formula_text: "I = U/R",
                description_text: "Current equals voltage divided by resistance.",
                variables: "I,U,R",
            },
            SeedFormula {
                name: "Velocity",
                formula_text: "v = s/t",
                description_text: "Distance travelled per unit of time.",
                variables: "v,s,t",
            },
        ],
    },
    SeedCategory {
        name: "Chemistry",
        icon_name: "flask",
        color_hex: "95E1D3",
        formulas: &[
            SeedFormula {
                name: "Amount of substance",
                formula_text: "n = m/M",
                description_text: "Moles from mass and molar mass.",
                variables: "n,m,M",
            },
            SeedFormula {
                name: "Ideal gas law",
                formula_text: "PV = nRT",
                description_text: "Pressure, volume and temperature of an ideal gas.",
                variables: "P,V,n,R,T",
            },
            SeedFormula {
                name: "Mass fraction",
                formula_text: "ω = m(solute)/m(solution)",
                description_text: "Share of a solute in a solution by mass.",
                variables: "ω,m",
            },
            SeedFormula {
                name: "Molar concentration",
                formula_text: "c = n/V",
                description_text: "Moles of solute per litre of solution.",
                variables: "c,n,V",
            },
            SeedFormula {
                name: "Density",
                formula_text: "ρ = m/V",
                description_text: "Mass per unit of volume.",
                variables: "ρ,m,V",
            },
        ],
    },
];

/// Inserts the default categories with their formulas when no category
/// exists yet; everything lands in one commit.
pub(super) fn seed_if_empty(store: &Store, clock: Arc<dyn Clock>) -> ServiceResult<usize> {
    if store.count(Category::NAME, &Query::new())? > 0 {
        return Ok(0);
    }

    let categories = EntityService::<Category>::new(store.clone());
    let formulas = EntityService::<Formula>::new(store.clone());
    let created_at = clock.now();
    let mut seeded = 0;

    for seed in DEFAULT_CATEGORIES {
        let category = categories.stage_create(
            Record::new(Category::NAME)
                .with("name", seed.name)
                .with("icon_name", seed.icon_name)
                .with("color_hex", seed.color_hex),
        )?;
        seeded += 1;

        for formula in seed.formulas {
            let new = NewFormula {
                name: formula.name.to_string(),
                formula_text: formula.formula_text.to_string(),
                description_text: formula.description_text.to_string(),
                variables: formula.variables.split(',').map(str::to_string).collect(),
                category_id: category.id(),
            };
            formulas.stage_create(new.into_record(created_at))?;
            seeded += 1;
        }
    }

    store.commit()?;
    Ok(seeded)
}
