use super::model::{Animal, AnimalCategory};
use crate::model::Record;
use crate::service::Entity;

struct SeedAnimal {
    name: &'static str,
    scientific_name: &'static str,
    description: &'static str,
    habitat: &'static str,
    lifespan: &'static str,
    fact: &'static str,
    category: AnimalCategory,
    image_name: &'static str,
}

const DEFAULT_ANIMALS: &[SeedAnimal] = &[
    SeedAnimal {
        name: "African elephant",
        scientific_name: "Loxodonta africana",
        description: "The largest land mammal on Earth, with remarkable intelligence and a complex social structure.",
        habitat: "Savannas, forests and deserts of Africa",
        lifespan: "60-70 years",
        fact: "Elephants recognise themselves in a mirror and mourn their dead.",
        category: AnimalCategory::Mammal,
        image_name: "elephant",
    },
    SeedAnimal {
        name: "Bengal tiger",
        scientific_name: "Panthera tigris tigris",
        description: "One of the largest cats, an excellent hunter and swimmer.",
        habitat: "Tropical forests and mangroves of India",
        lifespan: "10-15 years in the wild",
        fact: "Every tiger's stripe pattern is unique, like a human fingerprint.",
        category: AnimalCategory::Mammal,
        image_name: "tiger",
    },
    SeedAnimal {
        name: "Emperor penguin",
        scientific_name: "Aptenodytes forsteri",
        description: "The largest and heaviest penguin, adapted to the extreme Antarctic climate.",
        habitat: "Ice shores of Antarctica",
        lifespan: "15-20 years",
        fact: "Males incubate the egg for two months without food at temperatures down to -40°C.",
        category: AnimalCategory::Bird,
        image_name: "penguin",
    },
    SeedAnimal {
        name: "Golden eagle",
        scientific_name: "Aquila chrysaetos",
        description: "A powerful predator with keen eyesight and an incredible diving speed.",
        habitat: "Mountains and open country of the Northern Hemisphere",
        lifespan: "20-30 years",
        fact: "A golden eagle can spot a hare from three kilometres away.",
        category: AnimalCategory::Bird,
        image_name: "eagle",
    },
    SeedAnimal {
        name: "Green sea turtle",
        scientific_name: "Chelonia mydas",
        description: "A large sea turtle that feeds mostly on algae and seagrass.",
        habitat: "Tropical and subtropical waters of the world ocean",
        lifespan: "80-100 years",
        fact: "Sea turtles return to lay eggs on the beach where they hatched.",
        category: AnimalCategory::Reptile,
        image_name: "turtle",
    },
    SeedAnimal {
        name: "King cobra",
        scientific_name: "Ophiophagus hannah",
        description: "The longest venomous snake in the world and the only one that builds nests.",
        habitat: "Forests of South and Southeast Asia",
        lifespan: "20 years",
        fact: "A king cobra can raise a third of its body and look a person in the eye.",
        category: AnimalCategory::Reptile,
        image_name: "cobra",
    },
    SeedAnimal {
        name: "Great white shark",
        scientific_name: "Carcharodon carcharias",
        description: "One of the ocean's top predators, with a huge bite force and a sense for electric fields.",
        habitat: "Coastal waters of all oceans",
        lifespan: "70+ years",
        fact: "Sharks have existed for more than 400 million years.",
        category: AnimalCategory::Fish,
        image_name: "shark",
    },
    SeedAnimal {
        name: "Clownfish",
        scientific_name: "Amphiprioninae",
        description: "A bright reef fish living in symbiosis with sea anemones.",
        habitat: "Coral reefs of the Indian and Pacific oceans",
        lifespan: "6-10 years",
        fact: "Clownfish are born male and can change sex during their life.",
        category: AnimalCategory::Fish,
        image_name: "clownfish",
    },
    SeedAnimal {
        name: "Blue whale",
        scientific_name: "Balaenoptera musculus",
        description: "The largest animal that has ever lived, weighing up to 200 tonnes.",
        habitat: "Oceans worldwide",
        lifespan: "80-90 years",
        fact: "Its heart is the size of a small car and weighs about 600 kg.",
        category: AnimalCategory::Mammal,
        image_name: "whale",
    },
    SeedAnimal {
        name: "Red panda",
        scientific_name: "Ailurus fulgens",
        description: "A charming tree-dwelling mammal that eats mostly bamboo.",
        habitat: "Mountain forests of the Himalayas",
        lifespan: "8-10 years",
        fact: "The red panda was described 50 years before the giant panda.",
        category: AnimalCategory::Mammal,
        image_name: "redpanda",
    },
    SeedAnimal {
        name: "Hummingbird",
        scientific_name: "Trochilidae",
        description: "The smallest bird in the world, with an incredibly fast wingbeat.",
        habitat: "The Americas, from Alaska to Tierra del Fuego",
        lifespan: "3-5 years",
        fact: "Hummingbirds can fly backwards and hover in place.",
        category: AnimalCategory::Bird,
        image_name: "hummingbird",
    },
    SeedAnimal {
        name: "Chameleon",
        scientific_name: "Chamaeleonidae",
        description: "A lizard that changes colour and moves its eyes independently.",
        habitat: "Forests of Africa and Madagascar",
        lifespan: "5-10 years",
        fact: "Chameleons change colour to communicate and regulate temperature, not only to hide.",
        category: AnimalCategory::Reptile,
        image_name: "chameleon",
    },
];

pub(super) fn default_animals() -> impl Iterator<Item = Record> {
    DEFAULT_ANIMALS.iter().map(|seed| {
        Record::new(Animal::NAME)
            .with("name", seed.name)
            .with("scientific_name", seed.scientific_name)
            .with("description", seed.description)
            .with("habitat", seed.habitat)
            .with("lifespan", seed.lifespan)
            .with("fact", seed.fact)
            .with("category", seed.category.as_str())
            .with("image_name", seed.image_name)
            .with("is_favorite", false)
    })
}
