use anyhow::Context;
use chrono::Datelike;
use parking::{
    config::Config,
    core::{
        prelude::*,
        stats::{self, DailySummary, OccupancyStats},
    },
    domain::{billing, plate, prelude::*},
    stream::live::{self, LiveReading, LiveRefresh, Watch},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
comandos:
  occupy <vaga> <placa>           registrar entrada (placa AAA-9999 ou AAA9A99)
  vacate <vaga> <pix|card|cash>   liberar a vaga e cobrar a permanência
  view <vaga>                     detalhes de uma vaga ocupada
  board                           vagas ocupadas
  watch [vaga]                    atualizar o painel (ou uma vaga) a cada ciclo
  unwatch                         parar a atualização
  history [placa]                 histórico de saídas, com filtro opcional
  stats                           ocupação e faturamento do dia
  rates                           tabela de preços
  help | quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Occupy { spot: SpotNumber, plate: String },
    Vacate { spot: SpotNumber, payment_method: PaymentMethod },
    View { spot: SpotNumber },
    Board,
    Watch(Watch),
    Unwatch,
    History { query: String },
    Stats,
    Rates,
    Help,
    Quit,
}

fn parse_spot(raw: Option<&str>) -> Result<SpotNumber, String> {
    let raw = raw.ok_or("informe o número da vaga")?;
    raw.parse()
        .map_err(|_| format!("número de vaga inválido: {raw}"))
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err("comando vazio".to_string());
    };

    let command = match name {
        "occupy" => {
            let spot = parse_spot(words.next())?;
            let plate = words.collect::<Vec<_>>().join("");
            Command::Occupy { spot, plate }
        }
        "vacate" => {
            let spot = parse_spot(words.next())?;
            let method = words.next().ok_or("informe a forma de pagamento (pix, card ou cash)")?;
            let payment_method = method
                .parse()
                .map_err(|_| format!("forma de pagamento inválida: {method}"))?;
            Command::Vacate {
                spot,
                payment_method,
            }
        }
        "view" => Command::View {
            spot: parse_spot(words.next())?,
        },
        "board" => Command::Board,
        "watch" => match words.next() {
            None => Command::Watch(Watch::All),
            spot => Command::Watch(Watch::Spot(parse_spot(spot)?)),
        },
        "unwatch" => Command::Unwatch,
        "history" => Command::History {
            query: words.collect::<Vec<_>>().join(""),
        },
        "stats" => Command::Stats,
        "rates" => Command::Rates,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("comando desconhecido: {other} (veja help)")),
    };
    Ok(command)
}

fn print_readings(readings: &[LiveReading]) {
    if readings.is_empty() {
        println!("  nenhuma vaga ocupada");
    }
    for r in readings {
        println!(
            "  vaga {:>2}  {:<8}  {:<5}  {:>9}  {}",
            r.spot_number,
            r.license_plate,
            r.vehicle_type.label(),
            r.duration,
            r.value
        );
    }
}

/// Prints every reading of a live refresh until it is stopped.
fn follow(refresh: &LiveRefresh) {
    let mut rx = refresh.subscribe();
    tokio::spawn(async move {
        while let Ok(readings) = rx.recv().await {
            print_readings(&readings);
        }
        debug!("live view closed");
    });
}

async fn handle<S: Storage + 'static>(
    command: Command,
    store: &SharedStore<S>,
    layout: &LotLayout,
    config: &Config,
    live_view: &mut Option<LiveRefresh>,
) {
    match command {
        Command::Occupy {
            spot,
            plate: raw_plate,
        } => {
            let Some(vehicle_type) = layout.vehicle_type_for(spot) else {
                println!("vaga {spot} não existe");
                return;
            };
            let license_plate = match plate::parse_plate(&plate::format_plate(&raw_plate)) {
                Ok(license_plate) => license_plate,
                Err(e) => {
                    println!("{e}");
                    return;
                }
            };

            let mut store = store.write().await;
            if store.is_occupied(spot) {
                println!("vaga {spot} já está ocupada");
                return;
            }
            store.occupy_spot(spot, license_plate, vehicle_type);
            println!(
                "vaga {spot} ocupada ({}, {})",
                vehicle_type.label(),
                vehicle_type.rate_label()
            );
        }

        Command::Vacate {
            spot,
            payment_method,
        } => match store.write().await.vacate_spot(spot, payment_method) {
            Some(record) => println!(
                "vaga {spot} liberada: {} permaneceu {}, cobrado {} via {}",
                record.license_plate,
                record.duration,
                record.value,
                record.payment_method.label()
            ),
            None => println!("vaga {spot} está livre"),
        },

        Command::View { spot } => {
            let store = store.read().await;
            match store.spot(spot) {
                Some(occupied) => {
                    println!("vaga {spot} - ocupada");
                    println!("  placa    {}", occupied.license_plate);
                    println!("  tipo     {}", occupied.vehicle_type.label());
                    println!("  tarifa   {}", occupied.vehicle_type.rate_label());
                    println!("  tempo    {}", store.calculate_duration(occupied));
                    println!("  valor    {}", store.calculate_current_value(occupied));
                    println!(
                        "  entrada  {}",
                        billing::format_timestamp(occupied.entry_time, store.zone())
                    );
                }
                None => println!("vaga {spot} está livre"),
            }
        }

        Command::Board => print_readings(&live::readings(&*store.read().await, Watch::All)),

        Command::Watch(watch) => {
            let refresh = live::spawn(store.clone(), config.tick, watch);
            follow(&refresh);
            // replacing the previous view stops it
            *live_view = Some(refresh);
        }

        Command::Unwatch => {
            if let Some(refresh) = live_view.take() {
                refresh.stop();
            }
        }

        Command::History { query } => {
            let store = store.read().await;
            let records = stats::search_history(store.history(), &query);
            if records.is_empty() {
                println!("  nenhum registro encontrado");
            }
            for r in records {
                println!(
                    "  {:<8}  {:<5}  vaga {:>2}  {} -> {}  {:>9}  {}  {}",
                    r.license_plate,
                    r.vehicle_type.label(),
                    r.spot,
                    r.entry_time,
                    r.exit_time,
                    r.duration,
                    r.value,
                    r.payment_method.label()
                );
            }
        }

        Command::Stats => {
            let store = store.read().await;
            let occupancy = OccupancyStats::from_spots(store.occupied_spots(), layout);
            let today = store.clock().now().with_timezone(store.zone()).date_naive();
            let summary = DailySummary::for_date(store.history(), today, store.zone());

            println!(
                "  carros  {}/{} ({}%)",
                occupancy.cars,
                occupancy.car_capacity,
                occupancy.car_percent()
            );
            println!(
                "  motos   {}/{} ({}%)",
                occupancy.motorcycles,
                occupancy.motorcycle_capacity,
                occupancy.motorcycle_percent()
            );
            println!(
                "  total   {}/{} ({}%)",
                occupancy.total(),
                occupancy.capacity(),
                occupancy.total_percent()
            );
            println!(
                "  hoje {:02}/{:02}  {} saídas, faturamento {}",
                today.day(),
                today.month(),
                summary.exits,
                billing::format_currency(summary.earnings)
            );
            if let Some(minutes) = summary.average_stay_minutes {
                println!("  tempo médio {minutes}min");
            }
        }

        Command::Rates => {
            for vehicle_type in [VehicleType::Car, VehicleType::Motorcycle] {
                println!("  {:<5}  {}", vehicle_type.label(), vehicle_type.rate_label());
            }
        }

        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parking=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let storage = FileStorage::open(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    info!(data_dir = %storage.dir().display(), "opened data directory");
    let store = ParkingStore::load(storage, Arc::new(SystemClock), config.store_settings()).into_shared();
    let layout = LotLayout::standard();

    info!(tick_ms = config.tick.as_millis() as u64, "parking lot ready");
    println!("{HELP}");

    let mut live_view: Option<LiveRefresh> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => handle(command, &store, &layout, &config, &mut live_view).await,
            Err(e) => println!("{e}"),
        }
    }

    Ok(())
}
